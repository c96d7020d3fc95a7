/// Outcome of validating a table against its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    passed: bool,
    message: String,
}

impl ValidationVerdict {
    pub fn passed() -> Self {
        Self {
            passed: true,
            message: "ok".to_string(),
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            passed: false,
            message,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.passed
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}
