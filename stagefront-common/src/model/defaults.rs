//! Built-in site content used when no snapshot exists
//!
//! These values are the base layer of every merge.

use super::site_data::*;

fn nav(label: &str, href: &str) -> NavItem {
    NavItem {
        label: label.to_string(),
        href: href.to_string(),
    }
}

fn default_tracks() -> Vec<Track> {
    vec![
        Track {
            id: 1,
            title: "Harbor Lights".to_string(),
            artist: "Neon Harbor".to_string(),
            album: "Night Ferry".to_string(),
            duration: "4:12".to_string(),
            plays: 12840,
            audio_url: Some("https://cdn.neonharbor.band/audio/harbor-lights.mp3".to_string()),
            netease_id: None,
            lyrics: Some("The lights come on along the pier\nand every ship is coming home".to_string()),
        },
        Track {
            id: 2,
            title: "Salt & Static".to_string(),
            artist: "Neon Harbor".to_string(),
            album: "Night Ferry".to_string(),
            duration: "3:47".to_string(),
            plays: 9310,
            audio_url: Some("https://cdn.neonharbor.band/audio/salt-and-static.mp3".to_string()),
            netease_id: None,
            lyrics: None,
        },
        Track {
            id: 3,
            title: "Undertow".to_string(),
            artist: "Neon Harbor".to_string(),
            album: "Night Ferry".to_string(),
            duration: "5:03".to_string(),
            plays: 7702,
            audio_url: Some("https://music.163.com/song/media/outer/url?id=1901371647.mp3".to_string()),
            netease_id: Some("1901371647".to_string()),
            lyrics: None,
        },
    ]
}

impl Default for SiteData {
    fn default() -> Self {
        Self {
            admin_password: String::new(),
            navigation: vec![
                nav("Home", "#hero"),
                nav("Music", "#music"),
                nav("News", "#articles"),
                nav("Downloads", "#downloads"),
                nav("Contact", "#contact"),
            ],
            hero: Hero {
                title: "NEON HARBOR".to_string(),
                subtitle: "New album Night Ferry out now".to_string(),
                description: "Synth-driven rock from the edge of the docks.".to_string(),
                background_image: "/images/hero.jpg".to_string(),
                cta_label: "Listen Now".to_string(),
            },
            featured_album: FeaturedAlbum {
                title: "Night Ferry".to_string(),
                release_date: "2024-09-20".to_string(),
                cover_image: "/images/night-ferry.jpg".to_string(),
                description: "Ten tracks recorded live to tape over one winter.".to_string(),
                link: "#music".to_string(),
            },
            tracks: default_tracks(),
            articles: vec![Article {
                id: 1,
                title: "Night Ferry is out".to_string(),
                date: "2024-09-20".to_string(),
                category: "Release".to_string(),
                excerpt: "Our second record is finally here.".to_string(),
                content: "After a year in the studio, Night Ferry is available everywhere."
                    .to_string(),
                cover_image: "/images/night-ferry.jpg".to_string(),
                linked_track_id: Some(1),
            }],
            artists: vec![
                Artist {
                    id: 1,
                    name: "Mara Lind".to_string(),
                    role: "Vocals, Synth".to_string(),
                    bio: "Writes most of the lyrics on the night bus.".to_string(),
                    avatar: "/images/mara.jpg".to_string(),
                },
                Artist {
                    id: 2,
                    name: "Theo Vance".to_string(),
                    role: "Guitar".to_string(),
                    bio: "Owns too many delay pedals.".to_string(),
                    avatar: "/images/theo.jpg".to_string(),
                },
            ],
            resources: vec![Resource {
                id: 1,
                title: "Press Kit".to_string(),
                description: "Photos, logos and bio for press use.".to_string(),
                category: "press".to_string(),
                provider: "baidu".to_string(),
                link: "https://pan.baidu.com/s/neonharbor-press".to_string(),
                access_code: Some("nh24".to_string()),
                size: "48 MB".to_string(),
                date: "2024-09-01".to_string(),
            }],
            integrations: Integrations::default(),
            contact: Contact {
                email: "hello@neonharbor.band".to_string(),
                booking_email: "booking@neonharbor.band".to_string(),
                phone: String::new(),
                location: "Hamburg, DE".to_string(),
                socials: vec![
                    SocialLink {
                        platform: "instagram".to_string(),
                        url: "https://instagram.com/neonharbor".to_string(),
                    },
                    SocialLink {
                        platform: "bandcamp".to_string(),
                        url: "https://neonharbor.bandcamp.com".to_string(),
                    },
                ],
            },
        }
    }
}
