//! Pure reshaping of provider records into the dashboard's display shapes.
//!
//! The `Raw*` types mirror just enough of each provider's JSON to read the
//! fields we display. Every field is defaulted, so a record with missing
//! optional parts (no album art, no external URL, no description) still
//! deserializes, and every transformer here is total.

use serde::{Deserialize, Serialize};

/// A playable track, release or other collection entry as the dashboard shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub url: String,
    pub images: Vec<String>,
    pub preview_url: Option<String>,
    pub year: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSpotifyAlbum {
    pub name: String,
    pub images: Vec<RawImage>,
    pub release_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSpotifyTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<RawSpotifyArtist>,
    pub album: Option<RawSpotifyAlbum>,
    pub external_urls: Option<ExternalUrls>,
    pub preview_url: Option<String>,
}

pub fn track_to_collection_item(track: &RawSpotifyTrack) -> CollectionItem {
    let album = track.album.clone().unwrap_or_default();
    CollectionItem {
        id: track.id.clone(),
        title: track.name.clone(),
        artists: track.artists.iter().map(|a| a.name.clone()).collect(),
        album: album.name,
        url: track
            .external_urls
            .as_ref()
            .and_then(|u| u.spotify.clone())
            .unwrap_or_default(),
        images: album.images.into_iter().map(|i| i.url).collect(),
        preview_url: track.preview_url.clone(),
        year: album
            .release_date
            .get(..4)
            .and_then(|y| y.parse().ok()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDiscogsArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDiscogsImage {
    pub uri: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDiscogsRelease {
    pub id: u64,
    pub title: String,
    pub artists: Vec<RawDiscogsArtist>,
    pub uri: String,
    pub images: Vec<RawDiscogsImage>,
    pub year: Option<u32>,
}

pub fn release_to_collection_item(release: &RawDiscogsRelease) -> CollectionItem {
    CollectionItem {
        id: release.id.to_string(),
        title: release.title.clone(),
        artists: release.artists.iter().map(|a| a.name.clone()).collect(),
        album: release.title.clone(),
        url: release.uri.clone(),
        images: release.images.iter().map(|i| i.uri.clone()).collect(),
        preview_url: None,
        // Discogs reports an unknown year as 0.
        year: release.year.filter(|y| *y > 0),
    }
}

/// Flickr text fields arrive either as `{"_content": "..."}` or as a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFlickrText {
    Content {
        #[serde(rename = "_content")]
        content: String,
    },
    Plain(String),
}

impl RawFlickrText {
    pub fn into_string(self) -> String {
        match self {
            RawFlickrText::Content { content } => content,
            RawFlickrText::Plain(text) => text,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFlickrPhoto {
    pub id: String,
    pub title: String,
    pub description: Option<RawFlickrText>,
    pub datetaken: Option<String>,
    pub url_q: Option<String>,
    pub url_m: Option<String>,
    pub url_l: Option<String>,
    pub url_o: Option<String>,
}

/// Photo card shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlickrPhoto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date_taken: Option<String>,
    pub image_url: String,
    pub thumbnail_url: String,
    pub url: String,
}

pub fn photo_permalink(user_id: &str, photo_id: &str) -> String {
    format!("https://www.flickr.com/photos/{user_id}/{photo_id}")
}

pub fn photo_to_card(photo: &RawFlickrPhoto, user_id: &str) -> FlickrPhoto {
    let image_url = photo
        .url_l
        .clone()
        .or_else(|| photo.url_o.clone())
        .or_else(|| photo.url_m.clone())
        .unwrap_or_default();
    FlickrPhoto {
        id: photo.id.clone(),
        title: photo.title.clone(),
        description: photo
            .description
            .clone()
            .map(RawFlickrText::into_string)
            .unwrap_or_default(),
        date_taken: photo.datetaken.clone(),
        thumbnail_url: photo
            .url_q
            .clone()
            .or_else(|| photo.url_m.clone())
            .unwrap_or_else(|| image_url.clone()),
        image_url,
        url: photo_permalink(user_id, &photo.id),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCount {
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLanguage {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRepository {
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub homepage_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub primary_language: Option<RawLanguage>,
    pub stargazers: RawCount,
    pub forks: RawCount,
}

/// Repository card with nested counts flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub name: String,
    pub description: String,
    pub url: String,
    pub homepage_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub language: Option<String>,
    pub language_color: Option<String>,
    pub stargazers: u64,
    pub forks: u64,
}

pub fn flatten_repository(repo: &RawRepository) -> Repository {
    Repository {
        name: repo.name.clone(),
        description: repo.description.clone().unwrap_or_default(),
        url: repo.url.clone(),
        homepage_url: repo.homepage_url.clone().unwrap_or_default(),
        created_at: repo.created_at.clone(),
        updated_at: repo.updated_at.clone(),
        language: repo.primary_language.as_ref().map(|l| l.name.clone()),
        language_color: repo.primary_language.as_ref().and_then(|l| l.color.clone()),
        stargazers: repo.stargazers.total_count,
        forks: repo.forks.total_count,
    }
}
