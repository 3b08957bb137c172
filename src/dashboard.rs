//! The dashboard shell: one active panel, the signed-in user's profile and
//! the views and form behind the sidebar.
//!
//! Every panel change comes from an explicit user action. The shell starts on
//! [`ActivePanel::CallsInMyArea`].

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Identity, SessionContext};
use crate::cache::QueryCache;
use crate::error::{Error, Result};
use crate::form::RequestForm;
use crate::models::{Profile, Request, RequestId};
use crate::views::{visible, Flash, HandledView, MyRequestsView, OpenCallsView};

/// Which panel the shell shows.
///
/// Every dashboard opens on [`ActivePanel::CallsInMyArea`] whatever the
/// profile's [`Role`](crate::models::Role) says. Choosing the starting panel
/// by role was dropped on purpose: the panel only changes on user actions,
/// and a profile load finishing late must not move it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivePanel {
    #[default]
    CallsInMyArea,
    MyOpenedCalls,
    CallsIHandled,
    NewRequestForm,
}

pub struct Dashboard {
    cache: Arc<QueryCache>,
    session: SessionContext,
    identity: Identity,
    flash_ttl: Duration,
    panel: ActivePanel,
    profile: Option<Profile>,
    draft: Profile,
    profile_open: bool,
    flash: Option<Flash>,
    my_requests: MyRequestsView,
    open_calls: OpenCallsView,
    handled: HandledView,
    form: RequestForm,
}

impl Dashboard {
    /// Build the shell for the signed-in user and load the first panel.
    ///
    /// Fails only when nobody is signed in. A profile that cannot be loaded
    /// shows as an error message; a missing one is created from the sign-up
    /// metadata.
    pub async fn mount(
        cache: Arc<QueryCache>,
        session: SessionContext,
        flash_ttl: Duration,
    ) -> Result<Self> {
        let identity = session
            .identity()
            .ok_or_else(|| Error::auth("Not logged in"))?;
        let user_id = identity.user_id.clone();
        info!("mounting dashboard for {}", user_id);

        let mut dashboard = Self {
            cache,
            session,
            draft: Profile::new(user_id.clone()),
            identity,
            flash_ttl,
            panel: ActivePanel::default(),
            profile: None,
            profile_open: false,
            flash: None,
            my_requests: MyRequestsView::new(user_id.clone(), flash_ttl),
            open_calls: OpenCallsView::new(user_id.clone(), None, flash_ttl),
            handled: HandledView::new(user_id, flash_ttl),
            form: RequestForm::new(),
        };

        dashboard.load_profile().await;
        dashboard.refresh().await;
        Ok(dashboard)
    }

    async fn load_profile(&mut self) {
        let gateway = self.cache.gateway().clone();
        let user_id = &self.identity.user_id;

        let loaded = match gateway.fetch_profile(user_id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => {
                info!("no profile for {}, creating one", user_id);
                gateway.upsert_profile(&self.default_profile()).await
            }
            Err(e) => Err(e),
        };

        match loaded {
            Ok(profile) => self.apply_profile(profile),
            Err(e) => {
                warn!("profile unavailable: {}", e);
                self.flash = Some(Flash::error(
                    format!("Failed to load profile: {}", e.user_message()),
                    self.flash_ttl,
                ));
            }
        }
    }

    fn default_profile(&self) -> Profile {
        let metadata = &self.identity.metadata;
        Profile {
            full_name: metadata.full_name.clone(),
            role: metadata.user_type.unwrap_or_default(),
            ..Profile::new(self.identity.user_id.clone())
        }
    }

    fn apply_profile(&mut self, profile: Profile) {
        self.open_calls.set_city(profile.city.as_deref());
        self.draft = profile.clone();
        self.profile = Some(profile);
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn panel(&self) -> ActivePanel {
        self.panel
    }

    /// The last profile fetched or saved
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn flash(&self) -> Option<&Flash> {
        visible(&self.flash)
    }

    pub fn my_requests(&self) -> &MyRequestsView {
        &self.my_requests
    }

    pub fn open_calls(&self) -> &OpenCallsView {
        &self.open_calls
    }

    pub fn handled(&self) -> &HandledView {
        &self.handled
    }

    pub fn form(&self) -> &RequestForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut RequestForm {
        &mut self.form
    }

    /// Switch panels from the sidebar and load the list behind the new one.
    ///
    /// Picking the form from the sidebar always starts a new request.
    pub async fn navigate(&mut self, panel: ActivePanel) {
        if panel == ActivePanel::NewRequestForm && self.form.is_editing() {
            self.form.clear();
        }
        self.panel = panel;
        self.refresh().await;
    }

    /// Load the active panel's list, from the cache when possible
    pub async fn refresh(&mut self) {
        match self.panel {
            ActivePanel::CallsInMyArea => self.open_calls.load(&self.cache).await,
            ActivePanel::MyOpenedCalls => self.my_requests.load(&self.cache).await,
            ActivePanel::CallsIHandled => self.handled.load(&self.cache).await,
            ActivePanel::NewRequestForm => {}
        }
    }

    /// Drop the active panel's cached answer and load it again
    pub async fn reload(&mut self) {
        let query = match self.panel {
            ActivePanel::CallsInMyArea => self.open_calls.query(),
            ActivePanel::MyOpenedCalls => self.my_requests.query(),
            ActivePanel::CallsIHandled => self.handled.query(),
            ActivePanel::NewRequestForm => return,
        };
        self.cache.invalidate(&query);
        self.refresh().await;
    }

    /// Narrow the open calls to a city, reloading them when shown
    pub async fn set_city_filter(&mut self, city: Option<&str>) {
        if self.open_calls.set_city(city) && self.panel == ActivePanel::CallsInMyArea {
            self.refresh().await;
        }
    }

    /// Open one of the owner's requests in the form.
    ///
    /// Returns `false` when the request is not in the owner's list.
    pub fn edit_request(&mut self, id: RequestId) -> bool {
        match self.my_requests.edit(id) {
            Some(request) => {
                self.form = RequestForm::edit(request);
                self.panel = ActivePanel::NewRequestForm;
                true
            }
            None => false,
        }
    }

    /// Abandon the form and go back to the owner's list
    pub async fn cancel_form(&mut self) {
        self.form.clear();
        self.panel = ActivePanel::MyOpenedCalls;
        self.refresh().await;
    }

    /// Submit the form; on success show the owner's list with the change.
    ///
    /// On failure the form keeps its values and the error shows as a message.
    pub async fn submit_form(&mut self) -> Result<Request> {
        let editing = self.form.is_editing();
        match self.form.submit(&self.cache, &self.identity.user_id).await {
            Ok(request) => {
                let message = if editing {
                    "Request updated successfully!"
                } else {
                    "Request created successfully!"
                };
                self.flash = Some(Flash::success(message, self.flash_ttl));
                self.panel = ActivePanel::MyOpenedCalls;
                self.refresh().await;
                Ok(request)
            }
            Err(e) => {
                self.flash = Some(Flash::error(e.user_message(), self.flash_ttl));
                Err(e)
            }
        }
    }

    pub async fn delete_request(&mut self, id: RequestId) -> Result<()> {
        self.my_requests.delete(&self.cache, id).await
    }

    pub async fn claim_request(&mut self, id: RequestId) -> Result<Request> {
        self.open_calls.claim(&self.cache, id).await
    }

    /// Close a request from whichever list shows it
    pub async fn close_request(&mut self, id: RequestId) -> Result<Request> {
        if self.handled.requests().iter().any(|r| r.id == id) {
            self.handled.close(&self.cache, id).await
        } else {
            self.my_requests.close(&self.cache, id).await
        }
    }

    pub fn is_profile_open(&self) -> bool {
        self.profile_open
    }

    /// Open the profile editor on the last saved values
    pub fn open_profile(&mut self) {
        self.draft = self.saved_profile();
        self.profile_open = true;
    }

    /// Close the profile editor, discarding unsaved edits
    pub fn close_profile(&mut self) {
        self.draft = self.saved_profile();
        self.profile_open = false;
    }

    fn saved_profile(&self) -> Profile {
        self.profile
            .clone()
            .unwrap_or_else(|| self.default_profile())
    }

    pub fn profile_draft(&self) -> &Profile {
        &self.draft
    }

    pub fn profile_draft_mut(&mut self) -> &mut Profile {
        &mut self.draft
    }

    /// Write the draft back to the `profiles` table
    pub async fn save_profile(&mut self) -> Result<Profile> {
        let mut draft = self.draft.clone();
        draft.id = self.identity.user_id.clone();

        match self.cache.gateway().upsert_profile(&draft).await {
            Ok(saved) => {
                info!("profile saved for {}", saved.id);
                let city_changed = self.open_calls.set_city(saved.city.as_deref());
                self.apply_profile(saved.clone());
                self.profile_open = false;
                self.flash = Some(Flash::success("Profile updated", self.flash_ttl));
                if city_changed && self.panel == ActivePanel::CallsInMyArea {
                    self.refresh().await;
                }
                Ok(saved)
            }
            Err(e) => {
                self.flash = Some(Flash::error(
                    format!("Failed to save profile: {}", e.user_message()),
                    self.flash_ttl,
                ));
                Err(e)
            }
        }
    }

    /// Wait for the session to change.
    ///
    /// Returns `false` once the user signed out or another user signed in;
    /// the cache is cleared and the host should drop this dashboard.
    pub async fn watch_session(&mut self) -> bool {
        match self.session.changed().await {
            Ok(Some(identity)) if identity.user_id == self.identity.user_id => {
                self.identity = identity;
                true
            }
            _ => {
                info!("session for {} ended", self.identity.user_id);
                self.cache.clear();
                false
            }
        }
    }
}
