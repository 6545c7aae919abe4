//! Folders (IMAP, Exchange) and labels (Gmail)
//!
//! An account exposes one or the other depending on its
//! `organization_unit`.

use hyper::Method;

use crate::client::{Client, CountResponse, Query, VIEW_COUNT};
use crate::error::Result;
use crate::models::{Folder, Label};

/// Paging for folder and label listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub type FoldersOptions = PageOptions;
pub type LabelsOptions = PageOptions;

impl PageOptions {
    fn to_query(self) -> Query {
        let mut q = Query::new();
        q.opt("limit", self.limit);
        q.opt("offset", self.offset);
        q
    }
}

fn count_query() -> Query {
    let mut q = Query::new();
    q.push("view", VIEW_COUNT);
    q
}

impl Client {
    pub async fn folders(&self, opts: Option<&FoldersOptions>) -> Result<Vec<Folder>> {
        let query = opts.map(|o| o.to_query()).unwrap_or_default();
        let req = self.user_request(Method::GET, "/folders")?.query(query);
        self.execute_json(req, "folders").await
    }

    pub async fn folders_count(&self) -> Result<i64> {
        let req = self.user_request(Method::GET, "/folders")?.query(count_query());
        let resp: CountResponse = self.execute_json(req, "folders count").await?;
        Ok(resp.count)
    }

    pub async fn labels(&self, opts: Option<&LabelsOptions>) -> Result<Vec<Label>> {
        let query = opts.map(|o| o.to_query()).unwrap_or_default();
        let req = self.user_request(Method::GET, "/labels")?.query(query);
        self.execute_json(req, "labels").await
    }

    pub async fn labels_count(&self) -> Result<i64> {
        let req = self.user_request(Method::GET, "/labels")?.query(count_query());
        let resp: CountResponse = self.execute_json(req, "labels count").await?;
        Ok(resp.count)
    }
}
