//! Site data record types
//!
//! `SiteData` is the single aggregate synced to the KV store. Field names are
//! camelCase on the wire so the stored blob stays interchangeable with the
//! browser front end. Every struct is `#[serde(default)]` so partial records
//! from older snapshots still decode.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Track identifier, unique within `SiteData::tracks`
pub type TrackId = u64;

/// Navigation entry (label plus in-page anchor or URL)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavItem {
    pub label: String,
    pub href: String,
}

/// Hero copy block at the top of the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hero {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub background_image: String,
    pub cta_label: String,
}

/// Featured album summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturedAlbum {
    pub title: String,
    pub release_date: String,
    pub cover_image: String,
    pub description: String,
    pub link: String,
}

/// A playable track in the discography
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Display string ("3:42"), never parsed
    pub duration: String,
    pub plays: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// NetEase Cloud Music song id, when the audio is hosted there
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netease_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
}

impl Track {
    /// External provider references carried by this track as `(provider, id)`
    pub fn external_refs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.netease_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| ("netease", id))
            .into_iter()
    }
}

/// News / blog entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub date: String,
    pub category: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_track_id: Option<TrackId>,
}

/// Band member or collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artist {
    pub id: u64,
    pub name: String,
    pub role: String,
    pub bio: String,
    pub avatar: String,
}

/// Downloadable resource in the vault
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub provider: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    pub size: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// Contact / footer block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub email: String,
    pub booking_email: String,
    pub phone: String,
    pub location: String,
    pub socials: Vec<SocialLink>,
}

/// Cloud storage provider settings (stored only, never acted on)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudStorageConfig {
    pub enabled: bool,
    pub provider: String,
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
}

/// NetEase account settings (stored only, never acted on)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeteaseConfig {
    pub enabled: bool,
    pub user_id: String,
    pub playlist_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Integrations {
    pub cloud_storage: CloudStorageConfig,
    pub netease: NeteaseConfig,
}

/// The single aggregate record rendered by the site and synced to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteData {
    /// Plaintext admin gate password. Not a security control.
    pub admin_password: String,
    pub navigation: Vec<NavItem>,
    pub hero: Hero,
    pub featured_album: FeaturedAlbum,
    pub tracks: Vec<Track>,
    pub articles: Vec<Article>,
    pub artists: Vec<Artist>,
    pub resources: Vec<Resource>,
    pub integrations: Integrations,
    pub contact: Contact,
}

/// Consistency problem found by [`SiteData::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataIssue {
    DuplicateTrackId(TrackId),
    DuplicateArticleId(u64),
    DuplicateArtistId(u64),
    DuplicateResourceId(u64),
    /// Article links to a track id that is not in the track list
    DanglingTrackLink { article_id: u64, track_id: TrackId },
}

impl std::fmt::Display for DataIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataIssue::DuplicateTrackId(id) => write!(f, "duplicate track id {}", id),
            DataIssue::DuplicateArticleId(id) => write!(f, "duplicate article id {}", id),
            DataIssue::DuplicateArtistId(id) => write!(f, "duplicate artist id {}", id),
            DataIssue::DuplicateResourceId(id) => write!(f, "duplicate resource id {}", id),
            DataIssue::DanglingTrackLink { article_id, track_id } => write!(
                f,
                "article {} links to missing track {}",
                article_id, track_id
            ),
        }
    }
}

fn duplicates(ids: impl Iterator<Item = u64>) -> Vec<u64> {
    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for id in ids {
        if !seen.insert(id) && !dupes.contains(&id) {
            dupes.push(id);
        }
    }
    dupes
}

impl SiteData {
    pub fn find_track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Report id collisions and dangling article links
    ///
    /// Merged data is taken as-is; callers log the issues rather than reject.
    pub fn validate(&self) -> Vec<DataIssue> {
        let mut issues = Vec::new();

        issues.extend(
            duplicates(self.tracks.iter().map(|t| t.id)).into_iter().map(DataIssue::DuplicateTrackId),
        );
        issues.extend(
            duplicates(self.articles.iter().map(|a| a.id))
                .into_iter()
                .map(DataIssue::DuplicateArticleId),
        );
        issues.extend(
            duplicates(self.artists.iter().map(|a| a.id)).into_iter().map(DataIssue::DuplicateArtistId),
        );
        issues.extend(
            duplicates(self.resources.iter().map(|r| r.id))
                .into_iter()
                .map(DataIssue::DuplicateResourceId),
        );

        for article in &self.articles {
            if let Some(track_id) = article.linked_track_id {
                if self.find_track(track_id).is_none() {
                    issues.push(DataIssue::DanglingTrackLink {
                        article_id: article.id,
                        track_id,
                    });
                }
            }
        }

        issues
    }
}
