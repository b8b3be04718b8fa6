use crate::error::ReviewError;
use crate::review::session::ReviewSession;
use crate::service::CatalogService;
use tracing::info;

/// Ways of leaving the review page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    Route(String),
    CloseTab,
    Back,
}

/// Navigation held back because the session has unsaved edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNavigation {
    pub intent: NavigationIntent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed(NavigationIntent),
    Blocked(PendingNavigation),
}

/// Answer to the unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsavedChoice {
    Discard,
    SaveAndContinue,
    Stay,
}

impl ReviewSession {
    pub fn request_navigation(&self, intent: NavigationIntent) -> NavigationDecision {
        if self.has_unsaved_changes() {
            NavigationDecision::Blocked(PendingNavigation { intent })
        } else {
            NavigationDecision::Proceed(intent)
        }
    }

    /// Settle a blocked navigation. `Ok(None)` means stay on the page.
    ///
    /// A failed save keeps the user on the page with their edits.
    pub fn resolve_navigation(
        &mut self,
        pending: PendingNavigation,
        choice: UnsavedChoice,
        service: &dyn CatalogService,
    ) -> Result<Option<NavigationIntent>, ReviewError> {
        match choice {
            UnsavedChoice::Stay => Ok(None),
            UnsavedChoice::Discard => {
                info!(file_id = %self.file_id, "discarding unsaved changes");
                self.discard_changes()?;
                Ok(Some(pending.intent))
            }
            UnsavedChoice::SaveAndContinue => {
                self.save(service)?;
                Ok(Some(pending.intent))
            }
        }
    }
}
