//! Admin edits on the site data collections
//!
//! Entries with id 0 are new and receive `max(id) + 1`. Callers run these
//! through [`SiteStateController::update`](crate::state::SiteStateController::update)
//! so every edit is persisted.

use stagefront_common::model::{Article, Artist, Resource, Track, TrackId};
use stagefront_common::SiteData;
use std::collections::HashSet;

/// Collection entry with a numeric id
pub trait HasId {
    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

macro_rules! impl_has_id {
    ($($ty:ty),*) => {
        $(impl HasId for $ty {
            fn id(&self) -> u64 {
                self.id
            }
            fn set_id(&mut self, id: u64) {
                self.id = id;
            }
        })*
    };
}

impl_has_id!(Track, Article, Artist, Resource);

/// Next free id in `items`
///
/// One past the largest id; once that would overflow, the lowest unused id.
pub fn next_id<T: HasId>(items: &[T]) -> u64 {
    let max = items.iter().map(HasId::id).max().unwrap_or(0);
    max.checked_add(1).unwrap_or_else(|| {
        let used: HashSet<u64> = items.iter().map(HasId::id).collect();
        (1..u64::MAX).find(|id| !used.contains(id)).unwrap_or(u64::MAX)
    })
}

/// Replace the entry with the same id, or append a new one
///
/// Returns the id the entry ended up with.
pub fn upsert<T: HasId>(items: &mut Vec<T>, mut item: T) -> u64 {
    if item.id() == 0 {
        item.set_id(next_id(items));
    }
    let id = item.id();
    match items.iter_mut().find(|existing| existing.id() == id) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
    id
}

/// Remove the entry with `id`; returns whether one was removed
pub fn remove<T: HasId>(items: &mut Vec<T>, id: u64) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

pub fn upsert_track(data: &mut SiteData, track: Track) -> TrackId {
    upsert(&mut data.tracks, track)
}

/// Remove a track and clear article links pointing at it
pub fn remove_track(data: &mut SiteData, id: TrackId) -> bool {
    if !remove(&mut data.tracks, id) {
        return false;
    }
    for article in data.articles.iter_mut() {
        if article.linked_track_id == Some(id) {
            article.linked_track_id = None;
        }
    }
    true
}

/// Move a track to `index` (clamped to the list)
pub fn move_track(data: &mut SiteData, id: TrackId, index: usize) -> bool {
    let Some(from) = data.tracks.iter().position(|t| t.id == id) else {
        return false;
    };
    let track = data.tracks.remove(from);
    let to = index.min(data.tracks.len());
    data.tracks.insert(to, track);
    true
}

pub fn upsert_article(data: &mut SiteData, article: Article) -> u64 {
    upsert(&mut data.articles, article)
}

pub fn remove_article(data: &mut SiteData, id: u64) -> bool {
    remove(&mut data.articles, id)
}

pub fn upsert_artist(data: &mut SiteData, artist: Artist) -> u64 {
    upsert(&mut data.artists, artist)
}

pub fn remove_artist(data: &mut SiteData, id: u64) -> bool {
    remove(&mut data.artists, id)
}

pub fn upsert_resource(data: &mut SiteData, resource: Resource) -> u64 {
    upsert(&mut data.resources, resource)
}

pub fn remove_resource(data: &mut SiteData, id: u64) -> bool {
    remove(&mut data.resources, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: u64, title: &str) -> Track {
        Track {
            id,
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_entries_get_max_plus_one() {
        let mut data = SiteData {
            tracks: vec![track(3, "a"), track(7, "b")],
            ..Default::default()
        };

        let id = upsert_track(&mut data, track(0, "new"));

        assert_eq!(id, 8);
        assert_eq!(data.tracks.last().map(|t| t.title.as_str()), Some("new"));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_new_entry_after_max_id_does_not_overflow() {
        let mut data = SiteData {
            tracks: vec![track(1, "a"), track(u64::MAX, "b")],
            ..Default::default()
        };

        let id = upsert_track(&mut data, track(0, "new"));

        assert_eq!(id, 2);
        assert_eq!(data.tracks.len(), 3);
        assert_eq!(data.tracks[1].title, "b");
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut data = SiteData {
            tracks: vec![track(1, "a"), track(2, "b")],
            ..Default::default()
        };

        upsert_track(&mut data, track(1, "renamed"));

        assert_eq!(data.tracks.len(), 2);
        assert_eq!(data.tracks[0].title, "renamed");
    }

    #[test]
    fn test_remove_track_clears_article_links() {
        let mut data = SiteData {
            tracks: vec![track(1, "a"), track(2, "b")],
            articles: vec![Article {
                id: 1,
                linked_track_id: Some(2),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(remove_track(&mut data, 2));
        assert_eq!(data.articles[0].linked_track_id, None);
        assert!(!remove_track(&mut data, 2));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_move_track_clamps_index() {
        let mut data = SiteData {
            tracks: vec![track(1, "a"), track(2, "b"), track(3, "c")],
            ..Default::default()
        };

        assert!(move_track(&mut data, 1, 99));
        let order: Vec<u64> = data.tracks.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert!(!move_track(&mut data, 42, 0));
    }

    #[test]
    fn test_empty_collection_starts_at_one() {
        let mut data = SiteData {
            artists: Vec::new(),
            ..Default::default()
        };
        let id = upsert_artist(&mut data, Artist::default());
        assert_eq!(id, 1);
        assert!(remove_artist(&mut data, 1));
    }
}
