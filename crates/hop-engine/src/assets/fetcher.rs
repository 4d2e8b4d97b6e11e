use std::cell::RefCell;
use std::rc::Rc;
use crate::api::types::LoadTicket;
use crate::assets::asset::AssetKind;

/// Host seam for asynchronous asset loads.
///
/// `fetch` starts a load and returns immediately. The host later reports the
/// outcome as `HostEvent::AssetLoaded` carrying the same ticket.
pub trait AssetFetcher {
    fn fetch(&mut self, ticket: LoadTicket, url: &str, kind: AssetKind);
}

/// A fetch request captured by `RecordingFetcher`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub ticket: LoadTicket,
    pub url: String,
    pub kind: AssetKind,
}

/// Fetcher that only records requests. Tests complete them by hand.
#[derive(Debug, Clone, Default)]
pub struct RecordingFetcher {
    requests: Rc<RefCell<Vec<FetchRequest>>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl AssetFetcher for RecordingFetcher {
    fn fetch(&mut self, ticket: LoadTicket, url: &str, kind: AssetKind) {
        self.requests.borrow_mut().push(FetchRequest {
            ticket,
            url: url.to_string(),
            kind,
        });
    }
}
