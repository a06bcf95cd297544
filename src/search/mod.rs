//! Tantivy-based staff directory index.
//!
//! Backs the nominee picker: typed words match as prefixes against name,
//! email, position and department, with name matches ranked highest.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Staff;

const BOOST_NAME: f32 = 10.0;
const BOOST_EMAIL: f32 = 6.0;
const BOOST_POSITION: f32 = 3.0;
const BOOST_DEPARTMENT: f32 = 2.0;

/// Deepest result a caller may page to. The collector holds
/// `limit + offset` hits in memory.
pub const MAX_SEARCH_OFFSET: usize = 1_000;

/// Search result with staff id and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub staff_id: String,
    pub score: f32,
}

struct SearchFields {
    staff_id: Field,
    name: Field,
    email: Field,
    position: Field,
    department: Field,
}

pub struct SearchIndex {
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let staff_id = schema_builder.add_text_field("staff_id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT);
        let email = schema_builder.add_text_field("email", TEXT);
        let position = schema_builder.add_text_field("position", TEXT);
        let department = schema_builder.add_text_field("department", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            staff_id,
            name,
            email,
            position,
            department,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(15_000_000)
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Replace the whole index with the given staff list.
    pub async fn rebuild(&self, staff: &[Staff]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for member in staff {
            writer.add_document(self.create_document(member))?;
        }
        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Staff index rebuilt with {} entries", staff.len());
        Ok(())
    }

    /// Add or replace one staff member.
    pub async fn index_staff(&self, staff: &Staff) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.staff_id, &staff.id));
        writer.add_document(self.create_document(staff))?;
        writer.commit()?;
        self.reader.reload()?;

        Ok(())
    }

    pub async fn remove_staff(&self, staff_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.staff_id, staff_id));
        writer.commit()?;
        self.reader.reload()?;

        Ok(())
    }

    /// Every word of the query must prefix-match some field.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        let words = query_words(query_str);
        if words.is_empty() || limit == 0 || offset > MAX_SEARCH_OFFSET {
            return Ok(Vec::new());
        }

        let field_boosts = [
            (self.fields.name, BOOST_NAME),
            (self.fields.email, BOOST_EMAIL),
            (self.fields.position, BOOST_POSITION),
            (self.fields.department, BOOST_DEPARTMENT),
        ];

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for word in &words {
            let mut per_field: Vec<(Occur, Box<dyn Query>)> = Vec::new();
            for (field, boost) in field_boosts {
                let term = Term::from_field_text(field, word);
                let prefix = FuzzyTermQuery::new_prefix(term, 0, true);
                per_field.push((Occur::Should, Box::new(BoostQuery::new(Box::new(prefix), boost))));
            }
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(per_field))));
        }
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.saturating_add(offset)))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let staff_id = doc.get_first(self.fields.staff_id)?.as_str()?.to_string();
                Some(SearchResult { staff_id, score })
            })
            .collect();

        Ok(results)
    }

    fn create_document(&self, staff: &Staff) -> TantivyDocument {
        doc!(
            self.fields.staff_id => staff.id.clone(),
            self.fields.name => staff.name.clone(),
            self.fields.email => staff.email.clone(),
            self.fields.position => staff.position.clone(),
            self.fields.department => staff.department.clone()
        )
    }
}

/// Split user input the way the default tokenizer splits documents.
fn query_words(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}
