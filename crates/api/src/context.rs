use detailr_auth::{Identity, Viewer};

/// Authenticated caller for a request, inserted by the session middleware.
///
/// `None` when there is no valid session or the profile role could not be
/// resolved. Handlers pass it straight to the authorization guards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestIdentity(pub Option<Identity>);

impl RequestIdentity {
    pub fn from_viewer(viewer: &Viewer) -> Self {
        match viewer {
            Viewer::Authenticated { profile_id, .. } => {
                Self(viewer.role().map(|role| Identity::new(*profile_id, role)))
            }
            Viewer::Anonymous => Self(None),
        }
    }

    pub fn get(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}
