//! In-memory fakes for the completion and catalog seams

use async_trait::async_trait;
use promptlist_common::Track;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::catalog_client::{
    Catalog, CatalogAlbum, CatalogArtist, CatalogError, CatalogImage, CatalogPlaylist,
    CatalogTrack, CatalogUser,
};
use super::completion_client::{CompletionError, CompletionProvider};

pub fn track(title: &str, artist: &str) -> Track {
    Track::new(title, artist, "Album", 1984, 200)
}

pub fn catalog_track(id: &str, name: &str, artist: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: name.to_string(),
        uri: format!("spotify:track:{id}"),
        artists: vec![CatalogArtist {
            name: artist.to_string(),
        }],
        album: CatalogAlbum {
            name: format!("{name} (Remastered)"),
            release_date: "1983-11-30".to_string(),
            images: vec![CatalogImage {
                url: format!("https://img.example/{id}.jpg"),
            }],
        },
        duration_ms: 241_500,
    }
}

/// Completion provider replaying a fixed script of responses
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _max_tokens: u32,
    ) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Network("script exhausted".to_string())))
    }
}

type SearchHandler =
    Box<dyn Fn(&str, u32) -> Result<Vec<CatalogTrack>, CatalogError> + Send + Sync>;

/// Catalog answering searches through a closure and recording every call
pub struct FakeCatalog {
    search: SearchHandler,
    queries: Mutex<Vec<String>>,
    added: Mutex<Vec<Vec<String>>>,
    created: Mutex<Vec<(String, String)>>,
    user_error: Mutex<Option<CatalogError>>,
}

impl FakeCatalog {
    pub fn new(
        search: impl Fn(&str, u32) -> Result<Vec<CatalogTrack>, CatalogError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            search: Box::new(search),
            queries: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            user_error: Mutex::new(None),
        }
    }

    /// Every search returns nothing
    pub fn empty() -> Self {
        Self::new(|_, _| Ok(Vec::new()))
    }

    /// `current_user` fails once with `err`
    pub fn fail_current_user(self, err: CatalogError) -> Self {
        *self.user_error.lock().unwrap() = Some(err);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn added_batches(&self) -> Vec<Vec<String>> {
        self.added.lock().unwrap().clone()
    }

    /// `(name, description)` of created playlists
    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        _token: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.queries.lock().unwrap().push(query.to_string());
        (self.search)(query, limit)
    }

    async fn current_user(&self, _token: &str) -> Result<CatalogUser, CatalogError> {
        if let Some(err) = self.user_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(CatalogUser {
            id: "listener".to_string(),
            display_name: Some("Listener".to_string()),
        })
    }

    async fn create_playlist(
        &self,
        _user_id: &str,
        name: &str,
        description: &str,
        _public: bool,
        _token: &str,
    ) -> Result<CatalogPlaylist, CatalogError> {
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), description.to_string()));
        Ok(CatalogPlaylist {
            id: "pl1".to_string(),
            url: "https://open.spotify.com/playlist/pl1".to_string(),
        })
    }

    async fn add_tracks(
        &self,
        _playlist_id: &str,
        uris: &[String],
        _token: &str,
    ) -> Result<(), CatalogError> {
        self.added.lock().unwrap().push(uris.to_vec());
        Ok(())
    }
}
