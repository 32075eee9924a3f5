use std::{
    any::Any,
    fmt::{Display, Formatter},
};

/// Error with the name of the task that panicked and an error downcasted to string, if possible.
#[derive(Debug, Clone, thiserror::Error)]
pub struct PanickedTaskError {
    task_name: String,
    error: Option<String>,
}

impl Display for PanickedTaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let task_name = &self.task_name;
        if let Some(error) = &self.error {
            write!(f, "task `{task_name}` panicked: `{error}`")
        } else {
            write!(f, "task `{task_name}` panicked")
        }
    }
}

impl PanickedTaskError {
    pub(crate) fn new(task_name: &str, error: Box<dyn Any + Send>) -> Self {
        let error = match error.downcast::<String>() {
            Ok(value) => Some(*value),
            Err(error) => match error.downcast::<&str>() {
                Ok(value) => Some(value.to_string()),
                Err(_) => None,
            },
        };

        Self {
            task_name: task_name.to_string(),
            error,
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
