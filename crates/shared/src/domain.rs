use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Server-assigned identifiers arrive either as JSON strings or as integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum WireForm {
    #[default]
    Text,
    Number,
}

macro_rules! id_newtype {
    ($name:ident) => {
        /// Compared, hashed and displayed by its textual form; serialized back
        /// in the JSON type the service issued it with.
        #[derive(Debug, Clone)]
        pub struct $name {
            text: String,
            form: WireForm,
        }

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self {
                    text: value.into(),
                    form: WireForm::Text,
                }
            }

            pub fn numeric(value: i64) -> Self {
                Self {
                    text: value.to_string(),
                    form: WireForm::Number,
                }
            }

            pub fn as_str(&self) -> &str {
                &self.text
            }

            pub fn is_numeric(&self) -> bool {
                self.form == WireForm::Number
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.text == other.text
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.text.hash(state);
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.text.cmp(&other.text)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                match (self.form, self.text.parse::<i64>()) {
                    (WireForm::Number, Ok(number)) => serializer.serialize_i64(number),
                    _ => serializer.serialize_str(&self.text),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                Ok(match RawId::deserialize(deserializer)? {
                    RawId::Text(text) => Self::new(text),
                    RawId::Number(number) => Self::numeric(number),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.text)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

id_newtype!(ListId);
id_newtype!(TaskId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub content: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            completed: false,
        }
    }
}

/// The list metadata endpoint omits `tasks`; they are loaded per list afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: ListId,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TodoList {
    pub fn new(id: impl Into<ListId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tasks: Vec::new(),
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn task_ids(&self) -> Vec<&TaskId> {
        self.tasks.iter().map(|task| &task.id).collect()
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
