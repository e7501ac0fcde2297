mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Ann, Config, Embeddings, Fusion, MalformedRecords, MissingEmbedding, MissingQuery, Rerank, Runs,
	Runtime,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.runtime.log_level.is_empty() {
		return Err(Error::Validation {
			message: "runtime.log_level must be non-empty.".to_string(),
		});
	}
	if !cfg.fusion.rank_constant.is_finite() {
		return Err(Error::Validation {
			message: "fusion.rank_constant must be a finite number.".to_string(),
		});
	}
	if cfg.fusion.rank_constant < 0.0 {
		return Err(Error::Validation {
			message: "fusion.rank_constant must be zero or greater.".to_string(),
		});
	}
	if cfg.fusion.top_k == 0 {
		return Err(Error::Validation {
			message: "fusion.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.embeddings.dimensions == 0 {
		return Err(Error::Validation {
			message: "embeddings.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("ann.max_neighbors", cfg.ann.max_neighbors),
		("ann.ef_construction", cfg.ann.ef_construction),
		("ann.ef_search", cfg.ann.ef_search),
		("ann.top_k", cfg.ann.top_k),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	for (label, tag) in [
		("fusion.method_tag", &cfg.fusion.method_tag),
		("rerank.method_tag", &cfg.rerank.method_tag),
		("ann.method_tag", &cfg.ann.method_tag),
	] {
		validate_method_tag(label, tag)?;
	}

	Ok(())
}

/// Method tags end up as the last column of a whitespace-separated record.
pub fn validate_method_tag(label: &str, tag: &str) -> Result<()> {
	if tag.is_empty() {
		return Err(Error::Validation { message: format!("{label} must be non-empty.") });
	}
	if tag.chars().any(char::is_whitespace) {
		return Err(Error::Validation {
			message: format!("{label} must not contain whitespace."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.runtime.log_level = cfg.runtime.log_level.trim().to_string();

	for tag in [&mut cfg.fusion.method_tag, &mut cfg.rerank.method_tag, &mut cfg.ann.method_tag] {
		*tag = tag.trim().to_string();
	}
}
