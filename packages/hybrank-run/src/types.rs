use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredDoc {
	pub doc_id: String,
	/// Producer-local scale. Never comparable across methods.
	pub score: f64,
}

/// Best-first list of documents for one query. Rank is the 1-based position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedList {
	docs: Vec<ScoredDoc>,
}
impl RankedList {
	pub fn new() -> Self {
		Self::default()
	}

	/// Keeps the given order as the ranking.
	pub fn from_pairs<I, S>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (S, f64)>,
		S: Into<String>,
	{
		Self {
			docs: pairs
				.into_iter()
				.map(|(doc_id, score)| ScoredDoc { doc_id: doc_id.into(), score })
				.collect(),
		}
	}

	pub fn push(&mut self, doc_id: impl Into<String>, score: f64) {
		self.docs.push(ScoredDoc { doc_id: doc_id.into(), score });
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}

	pub fn docs(&self) -> &[ScoredDoc] {
		&self.docs
	}

	pub fn iter(&self) -> std::slice::Iter<'_, ScoredDoc> {
		self.docs.iter()
	}

	pub fn doc_ids(&self) -> impl Iterator<Item = &str> {
		self.docs.iter().map(|doc| doc.doc_id.as_str())
	}

	/// Yields `(rank, doc)` with 1-based ranks.
	pub fn ranked(&self) -> impl Iterator<Item = (usize, &ScoredDoc)> {
		self.docs.iter().enumerate().map(|(idx, doc)| (idx + 1, doc))
	}
}
impl<'a> IntoIterator for &'a RankedList {
	type IntoIter = std::slice::Iter<'a, ScoredDoc>;
	type Item = &'a ScoredDoc;

	fn into_iter(self) -> Self::IntoIter {
		self.docs.iter()
	}
}

/// One ranked list per query, remembering the order queries were first added.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Run {
	lists: HashMap<String, RankedList>,
	order: Vec<String>,
}
impl Run {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces any previous list for `query_id`; the query keeps its original position.
	pub fn insert(&mut self, query_id: impl Into<String>, list: RankedList) -> Option<RankedList> {
		let query_id = query_id.into();

		if !self.lists.contains_key(&query_id) {
			self.order.push(query_id.clone());
		}

		self.lists.insert(query_id, list)
	}

	/// Returns the list for `query_id`, creating an empty one at the end of the order if absent.
	pub fn list_mut(&mut self, query_id: &str) -> &mut RankedList {
		if !self.lists.contains_key(query_id) {
			self.order.push(query_id.to_string());
		}

		self.lists.entry(query_id.to_string()).or_default()
	}

	pub fn get(&self, query_id: &str) -> Option<&RankedList> {
		self.lists.get(query_id)
	}

	pub fn contains(&self, query_id: &str) -> bool {
		self.lists.contains_key(query_id)
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	/// Query ids in first-added order.
	pub fn query_ids(&self) -> &[String] {
		&self.order
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &RankedList)> {
		self.order
			.iter()
			.filter_map(|query_id| self.lists.get(query_id).map(|list| (query_id.as_str(), list)))
	}

	pub fn record_count(&self) -> usize {
		self.lists.values().map(RankedList::len).sum()
	}
}
impl FromIterator<(String, RankedList)> for Run {
	fn from_iter<I: IntoIterator<Item = (String, RankedList)>>(iter: I) -> Self {
		let mut run = Self::new();

		for (query_id, list) in iter {
			run.insert(query_id, list);
		}

		run
	}
}
