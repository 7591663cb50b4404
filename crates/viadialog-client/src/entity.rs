//! Provisioning entities: subscriber lines and the services that own them.

use chrono::{DateTime, FixedOffset};

/// Status given to enabled lines when the provider sends none.
pub const STATUS_ACTIVE: &str = "active";
/// Status given to disabled lines when the provider sends none.
pub const STATUS_INACTIVE: &str = "inactive";

/// A single provisioned telephone number (an "SDA" on the provider side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    id: i64,
    sda_number: String,
    usage: String,
    released_at: DateTime<FixedOffset>,
    enabled: bool,
    number: String,
    status: String,
}

impl Line {
    /// Build a line. A missing `status` is derived from `enabled`.
    pub fn new(
        id: i64,
        sda_number: impl Into<String>,
        usage: impl Into<String>,
        released_at: DateTime<FixedOffset>,
        enabled: bool,
        number: impl Into<String>,
        status: Option<String>,
    ) -> Self {
        let status = status.unwrap_or_else(|| derive_status(enabled).to_string());
        Self {
            id,
            sda_number: sda_number.into(),
            usage: usage.into(),
            released_at,
            enabled,
            number: number.into(),
            status,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Number as displayed by the provider.
    pub fn sda_number(&self) -> &str {
        &self.sda_number
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn released_at(&self) -> DateTime<FixedOffset> {
        self.released_at
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Canonical number. May differ from [`Line::sda_number`].
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_ACTIVE)
    }
}

fn derive_status(enabled: bool) -> &'static str {
    if enabled {
        STATUS_ACTIVE
    } else {
        STATUS_INACTIVE
    }
}

/// A named subscription grouping lines.
///
/// The service owns its lines; they carry no reference back to it. Lines can
/// only be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    id: i64,
    label: String,
    product: String,
    enabled: bool,
    lines: Vec<Line>,
}

impl Service {
    pub fn new(id: i64, label: impl Into<String>, product: impl Into<String>, enabled: bool) -> Self {
        Self {
            id,
            label: label.into(),
            product: product.into(),
            enabled,
            lines: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append a line, keeping provider order.
    pub fn push_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Find an owned line by its identifier.
    pub fn line(&self, id: i64) -> Option<&Line> {
        self.lines.iter().find(|line| line.id == id)
    }
}
