//! Data structures shared between the portal client and its callers.
//!
//! These types are serialised using [`serde`](https://serde.rs/) and mirror
//! the wire contract of the portal backend: entities come back with
//! PascalCase field names inside a `{status_code, message, data}` envelope,
//! while request bodies are sent snake_case.

use serde::{Deserialize, Deserializer, Serialize};

/// The backend serialises empty collections as JSON null.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A server-managed record with a stable identity field.
///
/// The reconciler only ever looks at this one field; everything else on an
/// entity is opaque to it.
pub trait Identified {
    fn identity(&self) -> &str;
}

/// Power state of a virtual machine as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "SHUTOFF")]
    Shutoff,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Shutoff => write!(f, "SHUTOFF"),
        }
    }
}

/// A provisioned virtual machine. Identity is `ServerId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualMachine {
    pub server_id: String,
    pub server_status: ServerStatus,
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub server_ip: String,
    #[serde(default)]
    pub server_image: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub group_members: Vec<String>,
    #[serde(default)]
    pub image_read_root_password: bool,
    #[serde(default)]
    pub image_display_name: String,
}

impl Identified for VirtualMachine {
    fn identity(&self) -> &str {
        &self.server_id
    }
}

/// An approved base image. Identity is the database `Id`, not the
/// provider-side `ImageId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    pub id: String,
    /// Carried as the strings "true"/"false" on the wire.
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub image_name: String,
    #[serde(default)]
    pub image_description: String,
    #[serde(default)]
    pub image_display_name: String,
    #[serde(default)]
    pub image_config: String,
    #[serde(default)]
    pub image_read_root_password: bool,
}

impl Identified for Image {
    fn identity(&self) -> &str {
        &self.id
    }
}

/// A portal administrator. Identity is `UserId` (an email address).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Administrator {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
}

impl Identified for Administrator {
    fn identity(&self) -> &str {
        &self.user_id
    }
}

/// A base image as known to the compute provider (`GET image/server`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerImage {
    pub image_id: String,
    #[serde(default)]
    pub name: String,
}

/// A published image entry offered in the ordering form (`GET image/published`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedImage {
    pub image_id: String,
    #[serde(default)]
    pub image_display_name: String,
}

/// A course from the roster provider. Only the fields the portal uses are
/// decoded; the provider sends many more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub course_code: String,
}

/// A student group within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseGroup {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A user enrolled in a course or group. `login_id` is the portal-side user
/// id; the provider omits it for some enrollment types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseUser {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub login_id: Option<String>,
}

/// Body for `POST vms/`.
#[derive(Debug, Clone, Serialize)]
pub struct VmOrder {
    pub server_name: String,
    pub group_name: String,
    pub users: Vec<String>,
    pub server_image: String,
}

/// Body for `POST vms/canvas` and `POST vms/canvas/all`.
///
/// The flag fields travel as strings ("1", "true", "false"); that is what
/// the backend binds them to.
#[derive(Debug, Clone, Serialize)]
pub struct RosterOrder {
    pub server_name: String,
    pub group_name: String,
    pub users: Vec<String>,
    pub server_image: String,
    pub everyone: String,
    pub include_ta: String,
    pub include_teacher: String,
    pub course_code: String,
}

/// Body for `POST admin/`.
#[derive(Debug, Clone, Serialize)]
pub struct AdminCreate {
    pub name: String,
    pub user_id: String,
}

/// Body for `PUT admin/`. `user_id` names the existing record, `updated_id`
/// the id it should have afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUpdate {
    pub name: String,
    pub user_id: String,
    pub updated_id: String,
}

/// Shared field set for `POST image/` and `PUT image/`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSpec {
    pub published: String,
    pub image_id: String,
    pub image_name: String,
    pub image_description: String,
    pub image_display_name: String,
    pub image_config: String,
    pub image_read_root_password: bool,
}

/// Body for `PUT image/`: an [`ImageSpec`] addressed at an existing record.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUpdate {
    pub id: String,
    #[serde(flatten)]
    pub spec: ImageSpec,
}

/// The response envelope every endpoint wraps its payload in.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Payload of `GET vms/{id}/console`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleTarget {
    pub url: String,
}
