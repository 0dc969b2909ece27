use std::collections::HashMap;

use tracing::{debug, warn};

use crate::metadata::{MetadataSource, SongMetadata};

/// Session-scoped memo over an ordered chain of sources.
pub struct MetadataCache {
    sources: Vec<Box<dyn MetadataSource>>,
    /// `None` marks an id no source could resolve
    entries: HashMap<String, Option<SongMetadata>>,
}

impl MetadataCache {
    pub fn new(sources: Vec<Box<dyn MetadataSource>>) -> Self {
        Self {
            sources,
            entries: HashMap::new(),
        }
    }

    /// Look up `song_id`, consulting the source chain only on first sight.
    pub fn get(&mut self, song_id: &str) -> Option<SongMetadata> {
        if let Some(cached) = self.entries.get(song_id) {
            return cached.clone();
        }

        let resolved = self.resolve_uncached(song_id);
        if resolved.is_none() {
            warn!("No metadata found for song {}", song_id);
        }
        self.entries.insert(song_id.to_string(), resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, song_id: &str) -> Option<SongMetadata> {
        for source in &self.sources {
            match source.resolve(song_id) {
                Ok(Some(metadata)) => {
                    debug!("Song {} resolved from {}", song_id, source.name());
                    return Some(metadata);
                }
                Ok(None) => debug!("Song {} not in {}", song_id, source.name()),
                Err(e) => warn!("Metadata source {} failed for {}: {}", source.name(), song_id, e),
            }
        }
        None
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}
