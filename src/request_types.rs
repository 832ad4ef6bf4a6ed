use serde::Deserialize;
use serde_json::Value;

// Bodies keep raw JSON values so type mismatches surface as validation
// messages instead of generic deserialization failures.

#[derive(Debug, Default, Deserialize)]
pub struct NewUserRequest {
    pub username: Option<Value>,
    pub email: Option<Value>,
}

impl NewUserRequest {
    pub fn username(&self) -> Option<&str> {
        non_empty_str(&self.username)
    }

    pub fn email(&self) -> Option<&str> {
        non_empty_str(&self.email)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePhotoRequest {
    pub image_url: Option<Value>,
    pub description: Option<Value>,
    pub alt_description: Option<Value>,
    pub tags: Option<Value>,
    pub user_id: Option<Value>,
}

impl SavePhotoRequest {
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_ref()?.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        non_empty_str(&self.description)
    }

    pub fn alt_description(&self) -> Option<&str> {
        non_empty_str(&self.alt_description)
    }

    /// A non-zero integer, matching the truthy-number check on `userId`.
    pub fn user_id(&self) -> Option<i64> {
        self.user_id.as_ref()?.as_i64().filter(|id| *id != 0)
    }

    /// Tag names, provided `tags` is an array made only of strings.
    pub fn tags(&self) -> Option<Vec<&str>> {
        string_array(self.tags.as_ref()?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddTagsRequest {
    #[serde(alias = "tags")]
    pub tages: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSearchQuery {
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageSearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryQuery {
    pub user_id: Option<String>,
}

fn non_empty_str(value: &Option<Value>) -> Option<&str> {
    value.as_ref()?.as_str().filter(|s| !s.is_empty())
}

pub(crate) fn string_array(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}
