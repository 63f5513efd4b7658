use serde::Serialize;

use super::query::{normalize_filter, MachineQuery, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineView {
    Authorized,
    Unauthorized,
}

impl MachineView {
    pub fn from_authorized(authorized: bool) -> Self {
        if authorized {
            MachineView::Authorized
        } else {
            MachineView::Unauthorized
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, MachineView::Authorized)
    }
}

/// Queries produced by a view switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub primary: MachineQuery,
    /// Present on first load and whenever the view actually changed.
    pub probe: Option<MachineQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewOption {
    pub label: String,
    pub view: MachineView,
}

/// Two-state Authorized/Unauthorized toggle plus the paging and filter
/// parameters of the active view.
#[derive(Debug, Clone)]
pub struct ViewSelector {
    active: MachineView,
    loaded: bool,
    offset: u32,
    limit: u32,
    text_filter: Option<String>,
}

impl ViewSelector {
    pub fn new(limit: u32, text_filter: Option<String>) -> Self {
        Self {
            active: MachineView::Authorized,
            loaded: false,
            offset: 0,
            limit,
            text_filter: normalize_filter(text_filter.as_deref()),
        }
    }

    pub fn active(&self) -> MachineView {
        self.active
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn text_filter(&self) -> Option<&str> {
        self.text_filter.as_deref()
    }

    pub fn select(&mut self, view: MachineView) -> ViewRequest {
        let switched = !self.loaded || self.active != view;
        self.active = view;
        self.loaded = true;
        self.offset = 0;
        ViewRequest {
            primary: self.current_query(),
            probe: switched.then(MachineQuery::unauthorized_probe),
        }
    }

    pub fn page(&mut self, offset: u32, limit: u32) -> MachineQuery {
        self.offset = offset;
        self.limit = limit;
        self.current_query()
    }

    pub fn filter(&mut self, text: Option<&str>) -> MachineQuery {
        self.text_filter = normalize_filter(text);
        self.offset = 0;
        self.current_query()
    }

    fn current_query(&self) -> MachineQuery {
        MachineQuery::page(
            self.offset,
            self.limit,
            self.text_filter.clone(),
            self.active.is_authorized(),
        )
    }
}

impl Default for ViewSelector {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, None)
    }
}

pub fn unauthorized_label(count: u64) -> String {
    if count > 0 {
        format!("Unauthorized ({count})")
    } else {
        "Unauthorized".to_string()
    }
}

/// Toggle options in display order.
pub fn view_options(unauthorized_total: u64) -> [ViewOption; 2] {
    [
        ViewOption {
            label: "Authorized".to_string(),
            view: MachineView::Authorized,
        },
        ViewOption {
            label: unauthorized_label(unauthorized_total),
            view: MachineView::Unauthorized,
        },
    ]
}
