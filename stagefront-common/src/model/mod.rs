//! Site data model

mod defaults;
mod site_data;

pub use site_data::{
    Article, Artist, CloudStorageConfig, Contact, DataIssue, FeaturedAlbum, Hero, Integrations,
    NavItem, NeteaseConfig, Resource, SiteData, SocialLink, Track, TrackId,
};
