//! Threaded (tree) news: nested bundles and categories, with each
//! category holding a flat article table linked via
//! `parent_id`/`first_child_id`/`prev_id`/`next_id`.
//!
//! `prev_id`/`next_id` form a single doubly linked list over every
//! article in the category in posting order, independent of thread
//! structure — the "previously latest" article's `next_id` always
//! points at whatever was just posted. `parent_id`/`first_child_id`
//! carry the thread structure separately: a parent's `first_child_id`
//! is set once, to its first-ever reply, and never moves afterward.
//! `id` 0 is never assigned to a real article, so it doubles as the
//! "no article" sentinel in every link field.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use htln_proto::DateStamp;
use serde::{Deserialize, Serialize};

use crate::error::NewsError;

/// A single news article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Category-local article ID. Never 0.
    pub id: u32,
    /// Article title.
    pub title: String,
    /// Display name of the poster.
    pub poster: String,
    /// Posting date.
    pub date: DateStamp,
    /// MIME-like flavor string (e.g. `"text/plain"`).
    pub flavor: String,
    /// Article body.
    pub data: Vec<u8>,
    /// ID of the article this one replies to, or 0 for a top-level post.
    pub parent_id: u32,
    /// ID of the previously posted article in the category, or 0 if this
    /// was the first.
    pub prev_id: u32,
    /// ID of the next posted article in the category, or 0 if this is
    /// the latest.
    pub next_id: u32,
    /// ID of this article's first reply, or 0 if it has none.
    pub first_child_id: u32,
}

/// A category: a flat, linked table of articles.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Category {
    articles: BTreeMap<u32, Article>,
    next_id: u32,
    /// ID of the most recently posted article still present, or 0.
    last_id: u32,
}

impl Category {
    fn new() -> Self {
        Self {
            articles: BTreeMap::new(),
            next_id: 1,
            last_id: 0,
        }
    }

    /// Articles in this category, by ID (ascending, not thread order).
    #[must_use]
    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.values()
    }

    /// Look up an article by ID.
    #[must_use]
    pub fn article(&self, id: u32) -> Option<&Article> {
        self.articles.get(&id)
    }

    /// IDs of the direct replies to `parent_id`, in posting order.
    fn children_of(&self, parent_id: u32) -> Vec<u32> {
        self.articles
            .values()
            .filter(|a| a.parent_id == parent_id)
            .map(|a| a.id)
            .collect()
    }

    /// Post a new article, threading it under `parent_id` (0 for
    /// top-level), and return its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::ArticleNotFound` if `parent_id` is non-zero and
    /// does not name an existing article in this category.
    pub fn post(
        &mut self,
        title: impl Into<String>,
        poster: impl Into<String>,
        date: DateStamp,
        flavor: impl Into<String>,
        data: Vec<u8>,
        parent_id: u32,
    ) -> Result<u32, NewsError> {
        if parent_id != 0 && !self.articles.contains_key(&parent_id) {
            return Err(NewsError::ArticleNotFound(parent_id));
        }

        let id = self.next_id;
        self.next_id += 1;

        let prev_id = self.last_id;

        self.articles.insert(
            id,
            Article {
                id,
                title: title.into(),
                poster: poster.into(),
                date,
                flavor: flavor.into(),
                data,
                parent_id,
                prev_id,
                next_id: 0,
                first_child_id: 0,
            },
        );

        if prev_id != 0 {
            self.articles.get_mut(&prev_id).unwrap().next_id = id;
        }
        if parent_id != 0 {
            let parent = self.articles.get_mut(&parent_id).unwrap();
            if parent.first_child_id == 0 {
                parent.first_child_id = id;
            }
        }
        self.last_id = id;

        Ok(id)
    }

    /// Delete an article and its entire reply subtree, relinking the
    /// posting-order chain and the parent's thread pointer around the gap.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::ArticleNotFound` if `id` does not exist.
    pub fn delete(&mut self, id: u32) -> Result<(), NewsError> {
        if !self.articles.contains_key(&id) {
            return Err(NewsError::ArticleNotFound(id));
        }
        for dead_id in self.collect_subtree(id) {
            self.unlink_and_remove(dead_id);
        }
        Ok(())
    }

    fn collect_subtree(&self, root: u32) -> Vec<u32> {
        let mut ids = vec![root];
        for child in self.children_of(root) {
            ids.extend(self.collect_subtree(child));
        }
        ids
    }

    /// Remove a single article, splicing it out of the posting-order
    /// chain and, if it was its parent's first reply, handing that
    /// pointer to the next-oldest surviving sibling.
    fn unlink_and_remove(&mut self, id: u32) {
        let Some(article) = self.articles.remove(&id) else {
            return;
        };

        if article.prev_id != 0 {
            if let Some(prev) = self.articles.get_mut(&article.prev_id) {
                prev.next_id = article.next_id;
            }
        }
        if article.next_id != 0 {
            if let Some(next) = self.articles.get_mut(&article.next_id) {
                next.prev_id = article.prev_id;
            }
        }
        if self.last_id == id {
            self.last_id = article.prev_id;
        }

        if article.parent_id != 0 {
            let needs_update = self
                .articles
                .get(&article.parent_id)
                .is_some_and(|p| p.first_child_id == id);
            if needs_update {
                let remaining_first = self.children_of(article.parent_id).into_iter().min().unwrap_or(0);
                self.articles.get_mut(&article.parent_id).unwrap().first_child_id = remaining_first;
            }
        }
    }
}

/// A bundle: a named folder holding nested bundles and categories.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Bundle {
    children: BTreeMap<String, NewsNode>,
}

/// A bundle's child: either a nested bundle or a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NewsNode {
    /// A nested bundle.
    Bundle(Bundle),
    /// A category.
    Category(Category),
}

/// The threaded news tree, rooted at an unnamed top-level bundle.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ThreadedNews {
    root: Bundle,
}

impl ThreadedNews {
    /// An empty threaded-news tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a threaded-news tree from a YAML file. Returns an empty tree
    /// if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::Io` or `NewsError::Serde` on failure.
    pub fn load(path: &Path) -> Result<Self, NewsError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_yaml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist this tree to a YAML file, overwriting any existing
    /// contents.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::Io` or `NewsError::Serde` on failure.
    pub fn save(&self, path: &Path) -> Result<(), NewsError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    fn bundle_at<'a>(&'a self, path: &[String]) -> Result<&'a Bundle, NewsError> {
        let mut bundle = &self.root;
        for name in path {
            match bundle.children.get(name) {
                Some(NewsNode::Bundle(b)) => bundle = b,
                Some(NewsNode::Category(_)) => return Err(NewsError::NotABundle(name.clone())),
                None => return Err(NewsError::NotFound(name.clone())),
            }
        }
        Ok(bundle)
    }

    fn bundle_at_mut<'a>(&'a mut self, path: &[String]) -> Result<&'a mut Bundle, NewsError> {
        let mut bundle = &mut self.root;
        for name in path {
            let node = bundle
                .children
                .get_mut(name)
                .ok_or_else(|| NewsError::NotFound(name.clone()))?;
            match node {
                NewsNode::Bundle(b) => bundle = b,
                NewsNode::Category(_) => return Err(NewsError::NotABundle(name.clone())),
            }
        }
        Ok(bundle)
    }

    /// Create a nested bundle named `name` under `path`.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::AlreadyExists` if a node with this name exists
    /// there already, or a not-found/not-a-bundle error if `path` is
    /// invalid.
    pub fn create_bundle(&mut self, path: &[String], name: &str) -> Result<(), NewsError> {
        let bundle = self.bundle_at_mut(path)?;
        if bundle.children.contains_key(name) {
            return Err(NewsError::AlreadyExists(name.to_string()));
        }
        bundle
            .children
            .insert(name.to_string(), NewsNode::Bundle(Bundle::default()));
        Ok(())
    }

    /// Create a category named `name` under `path`.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::AlreadyExists` if a node with this name exists
    /// there already, or a not-found/not-a-bundle error if `path` is
    /// invalid.
    pub fn create_category(&mut self, path: &[String], name: &str) -> Result<(), NewsError> {
        let bundle = self.bundle_at_mut(path)?;
        if bundle.children.contains_key(name) {
            return Err(NewsError::AlreadyExists(name.to_string()));
        }
        bundle
            .children
            .insert(name.to_string(), NewsNode::Category(Category::new()));
        Ok(())
    }

    /// Delete the bundle or category named `name` under `path`.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::NotFound` if no such node exists.
    pub fn delete_node(&mut self, path: &[String], name: &str) -> Result<(), NewsError> {
        let bundle = self.bundle_at_mut(path)?;
        bundle
            .children
            .remove(name)
            .ok_or_else(|| NewsError::NotFound(name.to_string()))?;
        Ok(())
    }

    /// List the names and kinds of direct children under `path`.
    ///
    /// # Errors
    ///
    /// Returns a not-found/not-a-bundle error if `path` is invalid.
    pub fn list_children(&self, path: &[String]) -> Result<Vec<(&str, bool)>, NewsError> {
        let bundle = self.bundle_at(path)?;
        Ok(bundle
            .children
            .iter()
            .map(|(name, node)| (name.as_str(), matches!(node, NewsNode::Bundle(_))))
            .collect())
    }

    /// Borrow the category at `path`/`name`.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::NotACategory` if the node is a bundle, or
    /// `NewsError::NotFound` if it does not exist.
    pub fn category(&self, path: &[String], name: &str) -> Result<&Category, NewsError> {
        let bundle = self.bundle_at(path)?;
        match bundle.children.get(name) {
            Some(NewsNode::Category(c)) => Ok(c),
            Some(NewsNode::Bundle(_)) => Err(NewsError::NotACategory(name.to_string())),
            None => Err(NewsError::NotFound(name.to_string())),
        }
    }

    /// Mutably borrow the category at `path`/`name`.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::NotACategory` if the node is a bundle, or
    /// `NewsError::NotFound` if it does not exist.
    pub fn category_mut(
        &mut self,
        path: &[String],
        name: &str,
    ) -> Result<&mut Category, NewsError> {
        let bundle = self.bundle_at_mut(path)?;
        match bundle.children.get_mut(name) {
            Some(NewsNode::Category(c)) => Ok(c),
            Some(NewsNode::Bundle(_)) => Err(NewsError::NotACategory(name.to_string())),
            None => Err(NewsError::NotFound(name.to_string())),
        }
    }
}
