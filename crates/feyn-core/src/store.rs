use crate::error::FeynResult;
use crate::record::{KnowledgeRecord, Tag};

pub trait RecordStore {
    // CRUD
    fn create(&self, record: KnowledgeRecord) -> FeynResult<String>;
    fn get(&self, id: &str) -> FeynResult<Option<KnowledgeRecord>>;
    fn update(&self, record: &KnowledgeRecord) -> FeynResult<()>;
    fn delete(&self, id: &str) -> FeynResult<()>;

    // Browsing
    fn list(&self, limit: usize) -> FeynResult<Vec<KnowledgeRecord>>;
    fn search(&self, query: &str, limit: usize) -> FeynResult<Vec<KnowledgeRecord>>;
    fn clear(&self) -> FeynResult<usize>;
    fn count(&self) -> FeynResult<usize>;
}

pub trait TagStore {
    fn create_tag(&self, tag: Tag) -> FeynResult<String>;
    fn get_tag(&self, id: &str) -> FeynResult<Option<Tag>>;
    fn find_tag_by_name(&self, name: &str) -> FeynResult<Option<Tag>>;
    fn list_tags(&self) -> FeynResult<Vec<Tag>>;
    fn update_tag(&self, tag: &Tag) -> FeynResult<()>;
    fn delete_tag(&self, id: &str) -> FeynResult<()>;
    fn get_tags_by_ids(&self, ids: &[String]) -> FeynResult<Vec<Tag>>;
}
