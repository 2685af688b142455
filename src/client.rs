//! HTTP client for the portal REST API.
//!
//! One typed method per endpoint, all sharing a single request core that
//! attaches the bearer token, classifies failures per [`crate::error`], and
//! decodes the `{status_code, message, data}` envelope. Methods that affect
//! an entity collection return a tagged [`ListResponse`] ready to feed into
//! [`crate::reconcile::reconcile`]; on any error the caller's collection is
//! simply left alone, since no response value is produced.

use std::time::Duration;

use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{message_from_body, ApiError};
use crate::reconcile::ListResponse;
use crate::types::{
    AdminCreate, AdminUpdate, Administrator, ConsoleTarget, Course, CourseGroup, CourseUser,
    Envelope, Image, ImageSpec, ImageUpdate, PublishedImage, RosterOrder, ServerImage,
    VirtualMachine, VmOrder,
};

/// Lifecycle actions accepted by `POST vms/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmAction {
    Start,
    Stop,
    Reboot,
    Respawn,
}

impl VmAction {
    fn as_path(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reboot => "reboot",
            Self::Respawn => "respawn",
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl ApiClient {
    /// Creates a client against `base` (e.g. `https://host/api/v1/`),
    /// authenticating every request with `token`.
    pub fn new(base: Url, token: String, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: ensure_trailing_slash(base),
            token,
        })
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope, ApiError> {
        let url = self.base.join(path)?;
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: message_from_body(&text),
            });
        }

        serde_json::from_str(&text).map_err(ApiError::Decode)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ListResponse<T>, ApiError> {
        let envelope = self.send::<()>(Method::GET, path, None).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// Decodes a payload that must be present for the call to make sense.
    fn require_data<T: DeserializeOwned>(envelope: Envelope) -> Result<T, ApiError> {
        match envelope.data {
            Some(value) => serde_json::from_value(value).map_err(ApiError::Decode),
            None => Err(ApiError::Api(crate::error::UNKNOWN_ERROR.to_string())),
        }
    }

    // --- virtual machines ---

    /// `GET vms/`: the calling user's machines.
    pub async fn my_vms(&self) -> Result<ListResponse<VirtualMachine>, ApiError> {
        self.get_list("vms/").await
    }

    /// `GET vms/all`: every machine in the system (administrators only).
    pub async fn all_vms(&self) -> Result<ListResponse<VirtualMachine>, ApiError> {
        self.get_list("vms/all").await
    }

    /// `GET vms/{id}/status`: refreshes one machine's power state. Usually a
    /// single-entity payload, fed into the reconciler as an in-place merge.
    pub async fn vm_status(&self, id: &str) -> Result<ListResponse<VirtualMachine>, ApiError> {
        self.get_list(&format!("vms/{id}/status")).await
    }

    /// `POST vms/{id}/{action}`: start, stop, reboot or respawn a machine.
    pub async fn vm_action(
        &self,
        id: &str,
        action: VmAction,
    ) -> Result<ListResponse<VirtualMachine>, ApiError> {
        let path = format!("vms/{id}/{}", action.as_path());
        let envelope = self.send::<()>(Method::POST, &path, None).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `POST vms/`: order a machine for the caller or an ad-hoc group.
    pub async fn order_vm(
        &self,
        order: &VmOrder,
    ) -> Result<ListResponse<VirtualMachine>, ApiError> {
        let envelope = self.send(Method::POST, "vms/", Some(order)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `POST vms/canvas` or `vms/canvas/all`: order machines from a course
    /// roster. `everyone` selects the per-student variant that provisions for
    /// the whole enrollment.
    pub async fn order_from_roster(
        &self,
        order: &RosterOrder,
        everyone: bool,
    ) -> Result<ListResponse<VirtualMachine>, ApiError> {
        let path = if everyone { "vms/canvas/all" } else { "vms/canvas" };
        let envelope = self.send(Method::POST, path, Some(order)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `DELETE vms/{id}`.
    pub async fn delete_vm(&self, id: &str) -> Result<ListResponse<VirtualMachine>, ApiError> {
        let envelope = self
            .send::<()>(Method::DELETE, &format!("vms/{id}"), None)
            .await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `GET vms/{id}/console`: a one-shot console URL for an active machine.
    pub async fn console_url(&self, id: &str) -> Result<String, ApiError> {
        let envelope = self
            .send::<()>(Method::GET, &format!("vms/{id}/console"), None)
            .await?;
        let target: ConsoleTarget = Self::require_data(envelope)?;
        Ok(target.url)
    }

    /// `GET vms/{id}/password`: the root password, for images that allow
    /// reading it.
    pub async fn root_password(&self, id: &str) -> Result<String, ApiError> {
        let envelope = self
            .send::<()>(Method::GET, &format!("vms/{id}/password"), None)
            .await?;
        Self::require_data(envelope)
    }

    // --- administrators ---

    /// `GET admin/`.
    pub async fn admins(&self) -> Result<ListResponse<Administrator>, ApiError> {
        self.get_list("admin/").await
    }

    /// `GET admin/{id}`: resolves whether `user_id` is an administrator.
    /// A non-success status means it is not.
    pub async fn admin_lookup(&self, user_id: &str) -> Result<Option<Administrator>, ApiError> {
        let envelope = match self
            .send::<()>(Method::GET, &format!("admin/{user_id}"), None)
            .await
        {
            Ok(envelope) => envelope,
            Err(ApiError::Status { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        match envelope.data {
            Some(value) if !value.is_null() => serde_json::from_value(value)
                .map(Some)
                .map_err(ApiError::Decode),
            _ => Ok(None),
        }
    }

    /// `POST admin/`.
    pub async fn add_admin(
        &self,
        body: &AdminCreate,
    ) -> Result<ListResponse<Administrator>, ApiError> {
        let envelope = self.send(Method::POST, "admin/", Some(body)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `PUT admin/`: rename an administrator and/or change their id.
    pub async fn update_admin(
        &self,
        body: &AdminUpdate,
    ) -> Result<ListResponse<Administrator>, ApiError> {
        let envelope = self.send(Method::PUT, "admin/", Some(body)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `DELETE admin/` with a `{user_id}` body.
    pub async fn delete_admin(
        &self,
        user_id: &str,
    ) -> Result<ListResponse<Administrator>, ApiError> {
        let body = serde_json::json!({ "user_id": user_id });
        let envelope = self.send(Method::DELETE, "admin/", Some(&body)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    // --- images ---

    /// `GET image/`.
    pub async fn images(&self) -> Result<ListResponse<Image>, ApiError> {
        self.get_list("image/").await
    }

    /// `GET image/published`: the subset offered in the ordering form.
    pub async fn published_images(&self) -> Result<Vec<PublishedImage>, ApiError> {
        let envelope = self.send::<()>(Method::GET, "image/published", None).await?;
        Self::require_data(envelope)
    }

    /// `GET image/server`: images available from the compute provider.
    pub async fn server_images(&self) -> Result<Vec<ServerImage>, ApiError> {
        let envelope = self.send::<()>(Method::GET, "image/server", None).await?;
        Self::require_data(envelope)
    }

    /// `GET image/config`: names of the available provisioning configs.
    pub async fn image_configs(&self) -> Result<Vec<String>, ApiError> {
        let envelope = self.send::<()>(Method::GET, "image/config", None).await?;
        Self::require_data(envelope)
    }

    /// `POST image/`.
    pub async fn add_image(&self, spec: &ImageSpec) -> Result<ListResponse<Image>, ApiError> {
        let envelope = self.send(Method::POST, "image/", Some(spec)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `PUT image/`: edit an image, including toggling `published`.
    pub async fn update_image(
        &self,
        update: &ImageUpdate,
    ) -> Result<ListResponse<Image>, ApiError> {
        let envelope = self.send(Method::PUT, "image/", Some(update)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    /// `DELETE image/` with an `{id}` body.
    pub async fn delete_image(&self, id: &str) -> Result<ListResponse<Image>, ApiError> {
        let body = serde_json::json!({ "id": id });
        let envelope = self.send(Method::DELETE, "image/", Some(&body)).await?;
        ListResponse::from_data(envelope.data).map_err(ApiError::Decode)
    }

    // --- course roster ---

    /// `GET courses/`.
    pub async fn courses(&self) -> Result<Vec<Course>, ApiError> {
        let envelope = self.send::<()>(Method::GET, "courses/", None).await?;
        Self::require_data(envelope)
    }

    /// `GET courses/{id}/groups`.
    pub async fn course_groups(&self, course_id: i64) -> Result<Vec<CourseGroup>, ApiError> {
        let envelope = self
            .send::<()>(Method::GET, &format!("courses/{course_id}/groups"), None)
            .await?;
        Self::require_data(envelope)
    }

    /// `GET courses/{id}/users`.
    pub async fn course_users(&self, course_id: i64) -> Result<Vec<CourseUser>, ApiError> {
        let envelope = self
            .send::<()>(Method::GET, &format!("courses/{course_id}/users"), None)
            .await?;
        Self::require_data(envelope)
    }

    /// `GET courses/groups/{id}/users`.
    pub async fn group_users(&self, group_id: i64) -> Result<Vec<CourseUser>, ApiError> {
        let envelope = self
            .send::<()>(Method::GET, &format!("courses/groups/{group_id}/users"), None)
            .await?;
        Self::require_data(envelope)
    }
}

fn ensure_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
