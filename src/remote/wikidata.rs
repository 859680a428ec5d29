//! HTTP knowledge base backed by Wikidata and Wikipedia.
use std::collections::HashMap;
use std::slice;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use itertools::Itertools;
use log::{debug, warn};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::{Gate, KnowledgeBase, Lookup};
use crate::error::Error;
use crate::lang::Lang;

const WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";
/// `{lang}` is replaced by the language code.
const SUMMARY_API: &str = "https://{lang}.wikipedia.org/api/rest_v1/page/summary/";
const USER_AGENT: &str = concat!("kgsample/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of ids per `wbgetentities` request.
pub const LABEL_BATCH: usize = 50;

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, Entity>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    labels: HashMap<String, Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct Summary {
    extract: Option<String>,
}

/// Labels of `id` in each of `langs`.
fn labels_of(entities: &HashMap<String, Entity>, id: &str, langs: &[Lang]) -> Vec<Lookup> {
    let labels = entities.get(id).map(|entity| &entity.labels);
    langs
        .iter()
        .map(|lang| {
            let label = labels.and_then(|l| l.get(lang.as_str()));
            Lookup::from_cached(label.map(|l| l.value.as_str()))
        })
        .collect()
}

fn api_error(err: &ApiError, n: usize) -> Vec<Lookup> {
    if err.code == "no-such-entity" {
        vec![Lookup::NotFound; n]
    } else {
        vec![Lookup::TransientError(format!("{}: {}", err.code, err.info)); n]
    }
}

/// Only an unknown id can poison a batch that is otherwise valid.
fn retry_singly(err: &ApiError, batch: usize) -> bool {
    batch > 1 && err.code == "no-such-entity"
}

/// Wikidata labels and Wikipedia summaries over HTTP.
pub struct Wikidata {
    client: reqwest::Client,
    gate: Gate,
    entity_api: Url,
    summary_api: String,
}

impl Wikidata {
    /// Client for the public endpoints, with at most `max_concurrency` requests in flight.
    pub fn new(max_concurrency: usize) -> Result<Self, Error> {
        Self::with_endpoints(max_concurrency, WIKIDATA_API, SUMMARY_API)
    }

    pub fn with_endpoints(
        max_concurrency: usize,
        entity_api: &str,
        summary_api: &str,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            gate: Gate::new(max_concurrency),
            entity_api: Url::parse(entity_api)?,
            summary_api: summary_api.to_string(),
        })
    }

    fn summary_url(&self, title: &str, lang: Lang) -> Result<Url, Error> {
        let mut url = Url::parse(&self.summary_api.replace("{lang}", lang.as_str()))?;
        url.path_segments_mut()
            .map_err(|_| Error::Custom(format!("{} cannot be a base url", self.summary_api)))?
            .pop_if_empty()
            .push(&title.replace(' ', "_"));
        Ok(url)
    }

    async fn get_entities(&self, ids: &[String], langs: &[Lang]) -> Result<EntitiesResponse, Error> {
        let ids = ids.join("|");
        let langs = langs.iter().map(Lang::as_str).join("|");
        let _permit = self
            .gate
            .enter()
            .await
            .map_err(|e| Error::Custom(e.to_string()))?;
        let body = self
            .client
            .get(self.entity_api.clone())
            .query(&[
                ("action", "wbgetentities"),
                ("ids", ids.as_str()),
                ("props", "labels"),
                ("languages", langs.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Labels of one id, without batch fallback.
    async fn single_labels(&self, id: &String, langs: &[Lang]) -> Vec<Lookup> {
        match self.get_entities(slice::from_ref(id), langs).await {
            Ok(EntitiesResponse {
                error: Some(err), ..
            }) => api_error(&err, langs.len()),
            Ok(resp) => labels_of(&resp.entities, id, langs),
            Err(e) => {
                warn!("fetching label of {id} failed: {e}");
                vec![Lookup::TransientError(e.to_string()); langs.len()]
            }
        }
    }

    /// Labels of a batch of ids; `result[i][j]` is the label of `ids[i]` in `langs[j]`.
    ///
    /// The API rejects a whole batch when one id is invalid, in which case ids are retried one by one.
    /// Other batch errors apply to every id.
    async fn batch_labels(&self, ids: &[String], langs: &[Lang]) -> Vec<Vec<Lookup>> {
        match self.get_entities(ids, langs).await {
            Ok(EntitiesResponse {
                error: Some(err), ..
            }) if retry_singly(&err, ids.len()) => {
                debug!("batch of {} rejected ({}), retrying ids one by one", ids.len(), err.code);
                let mut lookups = Vec::with_capacity(ids.len());
                for id in ids {
                    lookups.push(self.single_labels(id, langs).await);
                }
                lookups
            }
            Ok(EntitiesResponse {
                error: Some(err), ..
            }) => {
                debug!("batch of {} failed: {}", ids.len(), err.code);
                vec![api_error(&err, langs.len()); ids.len()]
            }
            Ok(resp) => ids
                .iter()
                .map(|id| labels_of(&resp.entities, id, langs))
                .collect(),
            Err(e) => {
                warn!("fetching labels failed: {e}");
                let lookup = Lookup::TransientError(e.to_string());
                vec![vec![lookup; langs.len()]; ids.len()]
            }
        }
    }
}

#[async_trait(?Send)]
impl KnowledgeBase for Wikidata {
    async fn labels(&self, ids: &[String], lang: Lang) -> Vec<Lookup> {
        let langs = [lang];
        let batches = join_all(
            ids.chunks(LABEL_BATCH)
                .map(|batch| self.batch_labels(batch, &langs)),
        )
        .await;
        batches
            .into_iter()
            .flatten()
            .map(|mut per_lang| {
                per_lang
                    .pop()
                    .unwrap_or_else(|| Lookup::TransientError("empty label result".to_string()))
            })
            .collect()
    }

    async fn summary(&self, title: &str, lang: Lang) -> Lookup {
        let url = match self.summary_url(title, lang) {
            Ok(url) => url,
            Err(e) => return Lookup::TransientError(e.to_string()),
        };
        let _permit = match self.gate.enter().await {
            Ok(permit) => permit,
            Err(e) => return Lookup::TransientError(e.to_string()),
        };

        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("summary of {title:?} failed: {e}");
                return Lookup::TransientError(e.to_string());
            }
        };

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Lookup::TransientError(format!("status {status}"));
        }
        if !status.is_success() {
            return Lookup::NotFound;
        }

        let summary = match resp.bytes().await {
            Ok(body) => serde_json::from_slice::<Summary>(&body).map_err(Error::from),
            Err(e) => Err(Error::from(e)),
        };
        match summary {
            Ok(summary) => {
                let extract = summary.extract.unwrap_or_default().replace('\n', " ");
                Lookup::from_cached(Some(extract.trim()))
            }
            Err(e) => Lookup::TransientError(e.to_string()),
        }
    }

    async fn labels_in(&self, id: &str, langs: &[Lang]) -> Vec<Lookup> {
        self.batch_labels(&[id.to_string()], langs)
            .await
            .pop()
            .unwrap_or_else(|| vec![Lookup::TransientError(format!("no label result for {id}")); langs.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_url_escapes_title() {
        let kb = Wikidata::new(1).unwrap();
        let url = kb.summary_url("Douglas Adams", Lang::De).unwrap();
        assert_eq!(
            url.as_str(),
            "https://de.wikipedia.org/api/rest_v1/page/summary/Douglas_Adams"
        );
        let url = kb.summary_url("AC/DC", Lang::En).unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/AC%2FDC"
        );
    }

    #[test]
    fn parse_entities() {
        let body = r#"{"entities":{
            "Q42":{"id":"Q42","labels":{"en":{"language":"en","value":"Douglas Adams"}}},
            "Q999999":{"id":"Q999999","missing":""}
        }}"#;
        let resp: EntitiesResponse = serde_json::from_str(body).unwrap();
        assert!(resp.error.is_none());
        let langs = [Lang::En, Lang::Ru];
        assert_eq!(
            labels_of(&resp.entities, "Q42", &langs),
            vec![Lookup::Found("Douglas Adams".to_string()), Lookup::NotFound]
        );
        assert_eq!(
            labels_of(&resp.entities, "Q999999", &langs),
            vec![Lookup::NotFound, Lookup::NotFound]
        );
    }

    #[test]
    fn parse_api_error() {
        let body = r#"{"error":{"code":"no-such-entity","info":"Could not find an entity with the ID \"Q0\"."}}"#;
        let resp: EntitiesResponse = serde_json::from_str(body).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(api_error(&err, 2), vec![Lookup::NotFound, Lookup::NotFound]);

        let other = ApiError {
            code: "maxlag".to_string(),
            info: String::new(),
        };
        assert!(matches!(api_error(&other, 1)[0], Lookup::TransientError(_)));
    }

    #[test]
    fn only_unknown_ids_split_a_batch() {
        let unknown = ApiError {
            code: "no-such-entity".to_string(),
            info: String::new(),
        };
        let lagging = ApiError {
            code: "maxlag".to_string(),
            info: "Waiting for a database server".to_string(),
        };
        assert!(retry_singly(&unknown, 50));
        assert!(!retry_singly(&unknown, 1));
        assert!(!retry_singly(&lagging, 50));
        assert!(!retry_singly(&lagging, 1));
    }
}
