//! Viewer session state machine and shared lifecycle flags
//!
//! ```text
//! Constructing ──► Unavailable ─┐
//!      │                        │
//!      ▼                        ▼
//!   Loading ──► Ready ───────► Destroyed
//!      │                        ▲
//!      └──────► Failed ─────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Lifecycle state of one viewer session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Constructing,
    Loading,
    Ready,
    Failed,
    Unavailable,
    Destroyed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Constructing, Loading)
                | (Constructing, Unavailable)
                | (Loading, Ready)
                | (Loading, Failed)
                | (Constructing | Loading | Ready | Failed | Unavailable, Destroyed)
        )
    }

    /// Stable until teardown
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Failed | SessionState::Unavailable
        )
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid session transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: SessionState,
    pub to: SessionState,
}

/// Conditions a viewer session can end up reporting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    #[error("no 3D model registered for Pokémon #{pokemon_id}")]
    Unavailable { pokemon_id: u32 },
    #[error("failed to load 3D model {path}: {reason}")]
    LoadFailed { path: String, reason: String },
    #[error("viewer surface is not drawable ({width}x{height})")]
    SurfaceNotDrawable { width: u32, height: u32 },
}

impl ViewerError {
    /// Short message for the viewer overlay
    pub fn user_message(&self) -> &'static str {
        match self {
            ViewerError::Unavailable { .. } => "3D model not available for this Pokémon",
            ViewerError::LoadFailed { .. } => "Error loading the 3D model",
            ViewerError::SurfaceNotDrawable { .. } => "The 3D viewer could not be displayed",
        }
    }
}

/// State plus the indicators the overlay shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    state: SessionState,
    error: Option<ViewerError>,
    loading: bool,
}

impl SessionStatus {
    /// A fresh session shows the loading indicator until it settles
    pub fn new() -> Self {
        Self {
            state: SessionState::Constructing,
            error: None,
            loading: true,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn error(&self) -> Option<&ViewerError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn transition(&mut self, next: SessionState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn begin_loading(&mut self) -> Result<(), TransitionError> {
        self.transition(SessionState::Loading)
    }

    pub fn mark_unavailable(&mut self, pokemon_id: u32) -> Result<(), TransitionError> {
        self.transition(SessionState::Unavailable)?;
        self.error = Some(ViewerError::Unavailable { pokemon_id });
        self.loading = false;
        Ok(())
    }

    pub fn mark_ready(&mut self) -> Result<(), TransitionError> {
        self.transition(SessionState::Ready)?;
        self.loading = false;
        Ok(())
    }

    pub fn mark_failed(&mut self, error: ViewerError) -> Result<(), TransitionError> {
        self.transition(SessionState::Failed)?;
        self.error = Some(error);
        self.loading = false;
        Ok(())
    }

    /// Move to `Destroyed`; returns `false` if already there
    pub fn destroy(&mut self) -> bool {
        if self.state == SessionState::Destroyed {
            return false;
        }
        self.state = SessionState::Destroyed;
        self.loading = false;
        true
    }
}

/// Shared flag that late callbacks check before touching a session
///
/// Clones observe the same flag. Revoking is one-way.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark as torn down; returns whether it was still alive
    pub fn revoke(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_path() {
        let mut status = SessionStatus::new();
        assert!(status.is_loading());
        status.begin_loading().unwrap();
        status.mark_ready().unwrap();
        assert_eq!(status.state(), SessionState::Ready);
        assert!(!status.is_loading());
        assert!(status.error().is_none());
        assert!(status.state().is_settled());
    }

    #[test]
    fn test_unavailable_path() {
        let mut status = SessionStatus::new();
        status.mark_unavailable(999).unwrap();
        assert_eq!(status.state(), SessionState::Unavailable);
        assert_eq!(
            status.error(),
            Some(&ViewerError::Unavailable { pokemon_id: 999 })
        );
        assert!(!status.is_loading());
    }

    #[test]
    fn test_no_return_to_loading() {
        let mut status = SessionStatus::new();
        status.begin_loading().unwrap();
        status
            .mark_failed(ViewerError::LoadFailed {
                path: "models/pikachu.glb".into(),
                reason: "404".into(),
            })
            .unwrap();

        let err = status.begin_loading().unwrap_err();
        assert_eq!(err.from, SessionState::Failed);
        assert_eq!(err.to, SessionState::Loading);
        assert!(status.mark_ready().is_err());
        assert_eq!(
            status.error().map(|e| e.user_message()),
            Some("Error loading the 3D model")
        );
    }

    #[test]
    fn test_ready_requires_loading() {
        let mut status = SessionStatus::new();
        assert!(status.mark_ready().is_err());
        status.mark_unavailable(7).unwrap();
        assert!(status.begin_loading().is_err());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut status = SessionStatus::new();
        status.mark_unavailable(999).unwrap();
        assert!(status.destroy());
        assert!(!status.destroy());
        assert_eq!(status.state(), SessionState::Destroyed);
        assert!(!SessionState::Destroyed.can_transition_to(SessionState::Loading));
    }

    #[test]
    fn test_liveness_shared_between_clones() {
        let liveness = Liveness::new();
        let observer = liveness.clone();
        assert!(observer.is_alive());
        assert!(liveness.revoke());
        assert!(!observer.is_alive());
        assert!(!observer.revoke());
    }
}
