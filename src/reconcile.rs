//! Entity list reconciliation.
//!
//! Every mutating or polling call against the portal comes back with one of
//! three payload shapes inside the response envelope: nothing, a single
//! entity, or a whole collection. [`ListResponse`] tags the shape once at the
//! decoding boundary so the reconciler itself never has to sniff raw JSON,
//! and [`reconcile`] applies it to a locally held collection.
//!
//! The local collection changes only through this function, and only after
//! the server has confirmed an operation; there are no optimistic updates.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::Identified;

/// A decoded server payload, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ListResponse<T> {
    /// No payload: the local collection is already current.
    None,
    /// One entity changed; merge it into the collection in place.
    Upsert(T),
    /// The authoritative new collection, in server order. An empty list
    /// clears the collection; this is distinct from [`ListResponse::None`].
    Replace(Vec<T>),
}

impl<T: DeserializeOwned> ListResponse<T> {
    /// Tags the `data` field of a response envelope.
    ///
    /// A JSON array is a full replacement, any other non-null value a single
    /// entity, and null or an absent field means no change. Several backend
    /// handlers answer a successful delete with `[]` rather than null; the
    /// distinction is load-bearing.
    pub fn from_data(data: Option<Value>) -> Result<Self, serde_json::Error> {
        match data {
            None | Some(Value::Null) => Ok(Self::None),
            Some(Value::Array(items)) => {
                let items = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<T>, _>>()?;
                Ok(Self::Replace(items))
            }
            Some(value) => Ok(Self::Upsert(serde_json::from_value(value)?)),
        }
    }
}

/// Computes the new local collection from the current one and a server
/// response.
///
/// Pure and total: the input is never mutated and a fresh collection is
/// always returned, so callers comparing by reference must adopt the return
/// value. Replacing twice with the same payload yields the same result.
///
/// An upsert whose identity is not present leaves the collection unchanged:
/// entities created elsewhere are only picked up by the next full refresh.
/// That mirrors the portal's behaviour and is a documented limitation, not
/// an accident.
pub fn reconcile<T>(current: &[T], response: &ListResponse<T>) -> Vec<T>
where
    T: Identified + Clone,
{
    match response {
        ListResponse::None => current.to_vec(),
        ListResponse::Replace(items) => items.clone(),
        ListResponse::Upsert(item) => current
            .iter()
            .map(|existing| {
                if existing.identity() == item.identity() {
                    item.clone()
                } else {
                    existing.clone()
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Administrator, Image, ServerStatus, VirtualMachine};
    use serde_json::json;

    fn vm(id: &str, status: ServerStatus) -> VirtualMachine {
        VirtualMachine {
            server_id: id.to_string(),
            server_status: status,
            server_name: String::new(),
            server_ip: String::new(),
            server_image: String::new(),
            user_id: String::new(),
            created: String::new(),
            group_members: Vec::new(),
            image_read_root_password: false,
            image_display_name: String::new(),
        }
    }

    fn image(id: &str, published: &str) -> Image {
        Image {
            id: id.to_string(),
            published: published.to_string(),
            image_id: String::new(),
            image_name: String::new(),
            image_description: String::new(),
            image_display_name: String::new(),
            image_config: String::new(),
            image_read_root_password: false,
        }
    }

    fn admin(user_id: &str) -> Administrator {
        Administrator {
            user_id: user_id.to_string(),
            name: String::new(),
        }
    }

    #[test]
    fn replace_is_authoritative_regardless_of_prior_contents() {
        let current = vec![vm("a", ServerStatus::Active), vm("b", ServerStatus::Active)];
        let replacement = vec![
            vm("c", ServerStatus::Shutoff),
            vm("a", ServerStatus::Active),
        ];
        let response = ListResponse::Replace(replacement.clone());

        assert_eq!(reconcile(&current, &response), replacement);
        assert_eq!(reconcile(&[], &response), replacement);
    }

    #[test]
    fn none_is_identity_not_empty() {
        let current = vec![vm("a", ServerStatus::Active)];
        let result = reconcile(&current, &ListResponse::None);
        assert_eq!(result, current);

        let empty: Vec<VirtualMachine> = Vec::new();
        assert_eq!(reconcile(&empty, &ListResponse::None), empty);
    }

    #[test]
    fn upsert_replaces_in_place_preserving_order() {
        let current = vec![
            vm("a", ServerStatus::Active),
            vm("b", ServerStatus::Active),
            vm("c", ServerStatus::Shutoff),
        ];
        let response = ListResponse::Upsert(vm("b", ServerStatus::Shutoff));

        let result = reconcile(&current, &response);
        assert_eq!(result.len(), current.len());
        assert_eq!(result[0], current[0]);
        assert_eq!(result[1], vm("b", ServerStatus::Shutoff));
        assert_eq!(result[2], current[2]);
    }

    #[test]
    fn upsert_of_unknown_identity_is_dropped_not_appended() {
        let current = vec![vm("a", ServerStatus::Active)];
        let response = ListResponse::Upsert(vm("z", ServerStatus::Shutoff));
        assert_eq!(reconcile(&current, &response), current);
    }

    #[test]
    fn replace_is_idempotent() {
        let current = vec![vm("a", ServerStatus::Active)];
        let response = ListResponse::Replace(vec![
            vm("b", ServerStatus::Active),
            vm("c", ServerStatus::Shutoff),
        ]);

        let once = reconcile(&current, &response);
        let twice = reconcile(&once, &response);
        assert_eq!(once, twice);
    }

    #[test]
    fn poll_tick_updates_vm_status() {
        let current = vec![vm("a", ServerStatus::Active)];
        let response = ListResponse::Upsert(vm("a", ServerStatus::Shutoff));

        let result = reconcile(&current, &response);
        assert_eq!(result, vec![vm("a", ServerStatus::Shutoff)]);
    }

    #[test]
    fn publish_toggle_replaces_image_list_wholesale() {
        let current = vec![image("1", "false"), image("2", "true")];
        let replacement = vec![image("1", "true"), image("2", "true")];
        let response = ListResponse::Replace(replacement.clone());

        assert_eq!(reconcile(&current, &response), replacement);
    }

    #[test]
    fn delete_with_empty_list_clears_administrators() {
        let current = vec![admin("x@uia.no")];
        let response = ListResponse::Replace(Vec::new());
        assert_eq!(reconcile(&current, &response), Vec::<Administrator>::new());
    }

    #[test]
    fn from_data_tags_null_as_none() {
        let tagged = ListResponse::<Administrator>::from_data(None).unwrap();
        assert_eq!(tagged, ListResponse::None);

        let tagged = ListResponse::<Administrator>::from_data(Some(Value::Null)).unwrap();
        assert_eq!(tagged, ListResponse::None);
    }

    #[test]
    fn from_data_tags_array_as_replace() {
        let data = json!([{"UserId": "x@uia.no", "Name": "X"}]);
        let tagged = ListResponse::<Administrator>::from_data(Some(data)).unwrap();
        assert_eq!(
            tagged,
            ListResponse::Replace(vec![Administrator {
                user_id: "x@uia.no".into(),
                name: "X".into(),
            }])
        );
    }

    #[test]
    fn from_data_tags_empty_array_as_replace() {
        let tagged = ListResponse::<Administrator>::from_data(Some(json!([]))).unwrap();
        assert_eq!(tagged, ListResponse::Replace(Vec::new()));
    }

    #[test]
    fn from_data_tags_object_as_upsert() {
        let data = json!({"UserId": "x@uia.no", "Name": "X"});
        let tagged = ListResponse::<Administrator>::from_data(Some(data)).unwrap();
        assert!(matches!(tagged, ListResponse::Upsert(_)));
    }

    #[test]
    fn from_data_surfaces_decode_errors() {
        let data = json!({"unexpected": true});
        assert!(ListResponse::<Administrator>::from_data(Some(data)).is_err());
    }
}
