//! Page routes and their text renderings.

use std::fmt::Write as _;

use crate::form::FormState;
use crate::storage::StateStore;

/// A navigable page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The welcome page at `/`.
    Landing,
    /// The report form at `/reporting-form`.
    ReportForm,
}

impl Route {
    /// Every route, in navigation order.
    pub const ALL: [Route; 2] = [Route::Landing, Route::ReportForm];

    /// The route's path.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::ReportForm => "/reporting-form",
        }
    }

    /// Resolve a path; a trailing slash is ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|r| r.path() == normalized)
    }
}

/// A navigation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Link text.
    pub label: &'static str,
    /// Target page.
    pub target: Route,
}

/// The welcome page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandingPage {
    /// Page heading.
    pub title: &'static str,
    /// Link to the report form.
    pub link: Link,
}

impl Default for LandingPage {
    fn default() -> Self {
        Self {
            title: "Welcome",
            link: Link {
                label: "Go to Reporting Form →",
                target: Route::ReportForm,
            },
        }
    }
}

impl LandingPage {
    /// Plain-text rendering.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{}\n\n{} ({})\n",
            self.title,
            self.link.label,
            self.link.target.path()
        )
    }
}

/// Heading of the report form page.
pub const FORM_TITLE: &str = "Incident Reporting Form";

/// Render the form page's status as plain text: the marker, the uploads and
/// the conditional fields currently shown.
#[must_use]
pub fn render_form<S: StateStore>(form: &FormState<S>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{FORM_TITLE}");
    let _ = writeln!(
        out,
        "Please fill out all required fields to submit your incident report"
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Body Injury Location");
    match form.get().marker_position() {
        Some(position) => {
            let _ = write!(
                out,
                "  Injury Location Selected: X: {}, Y: {}",
                position.x, position.y
            );
            if let Some(size) = form.diagram().image_size() {
                let _ = write!(out, " (Image: {} x {}px)", size.width, size.height);
            }
            let _ = writeln!(out);
        }
        None => {
            let _ = writeln!(
                out,
                "  Click on the body diagram to mark the location of injury"
            );
        }
    }
    if let Some(overlay) = form.diagram().overlay_percent() {
        let _ = writeln!(
            out,
            "  Marker at {:.1}% left, {:.1}% top",
            overlay.left, overlay.top
        );
    }
    let _ = writeln!(out);

    let uploads = form.uploads();
    let _ = writeln!(out, "Incident Image Upload");
    if let Some(error) = uploads.error() {
        for line in error.lines() {
            let _ = writeln!(out, "  ! {line}");
        }
    } else if let Some(summary) = uploads.summary() {
        let _ = writeln!(out, "  {summary}");
        for (index, file) in uploads.files().iter().enumerate() {
            let _ = writeln!(out, "  [{index}] {}", file.name);
        }
    } else {
        let _ = writeln!(out, "  No images uploaded");
    }
    let _ = writeln!(out);

    let shown = form.visible_conditional_fields();
    let _ = writeln!(out, "Conditional fields shown");
    if shown.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for path in shown {
        let _ = writeln!(out, "  {path}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Go Home ({})", Route::Landing.path());
    out
}
