use rust_htslib::bam::HeaderView;
use rustc_hash::FxHashMap;

/// Reference sequences declared in an alignment header, in header order
pub struct ReferenceIndex {
    names: Vec<String>,
    lengths: Vec<u64>,
    name_to_id: FxHashMap<String, u32>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        ReferenceIndex {
            names: Vec::new(),
            lengths: Vec::new(),
            name_to_id: FxHashMap::default(),
        }
    }

    pub fn from_header(header: &HeaderView) -> Self {
        let mut index = ReferenceIndex::new();
        for (tid, name) in header.target_names().iter().enumerate() {
            let length = header.target_len(tid as u32).unwrap_or(0);
            index.insert(&String::from_utf8_lossy(name), length);
        }
        index
    }

    pub fn insert(&mut self, name: &str, length: u64) -> u32 {
        *self.name_to_id.entry(name.to_owned()).or_insert_with(|| {
            self.names.push(name.to_owned());
            self.lengths.push(length);
            (self.names.len() - 1) as u32
        })
    }

    pub fn get_id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    /// Name of the reference a record points at; negative tids are unplaced reads
    pub fn get_name(&self, tid: i32) -> Option<&str> {
        usize::try_from(tid)
            .ok()
            .and_then(|id| self.names.get(id))
            .map(String::as_str)
    }

    pub fn get_len(&self, name: &str) -> Option<u64> {
        self.get_id(name).map(|id| self.lengths[id as usize])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ReferenceIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Key a reference is tallied under: the whole name, or its first token when a delimiter is set
pub fn reference_key<'a>(name: &'a str, delim: Option<&str>) -> &'a str {
    match delim {
        Some(d) if !d.is_empty() => name.split(d).next().unwrap_or(name),
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_header_order() {
        let mut index = ReferenceIndex::new();
        assert_eq!(index.insert("chr1", 1000), 0);
        assert_eq!(index.insert("chr2", 500), 1);
        assert_eq!(index.insert("chr1", 9999), 0);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get_name(1), Some("chr2"));
        assert_eq!(index.get_name(-1), None);
        assert_eq!(index.get_len("chr1"), Some(1000));
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["chr1", "chr2"]);
    }

    #[test]
    fn test_reference_key() {
        assert_eq!(reference_key("HG002#1#chr1", Some("#")), "HG002");
        assert_eq!(reference_key("chr1", Some("#")), "chr1");
        assert_eq!(reference_key("chr1_random", None), "chr1_random");
    }
}
