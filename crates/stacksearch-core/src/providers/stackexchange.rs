// StackExchange provider - bridges the API client with StackExchangeSource
use async_trait::async_trait;
use stacksearch_api::{ApiQuestion, ApiSite, ClientOptions, SearchRequest, StackExchangeClient};
use tracing::info;

use crate::{
    models::{Question, QuotaInfo, SearchQuery, SearchResponse, Site},
    search::StackExchangeSource,
    Result,
};

/// Wrapper around StackExchangeClient that implements StackExchangeSource
pub struct StackExchangeProvider {
    client: StackExchangeClient,
}

impl StackExchangeProvider {
    pub fn new(options: ClientOptions) -> Result<Self> {
        Ok(Self {
            client: StackExchangeClient::new(options)?,
        })
    }
}

#[async_trait]
impl StackExchangeSource for StackExchangeProvider {
    async fn sites(&self) -> Result<Vec<Site>> {
        let sites = self.client.all_sites().await?;

        Ok(sites
            .into_iter()
            .filter(|site| {
                if site.is_closed_beta() {
                    info!("Ignored {:?} (closed beta)", site.api_site_parameter);
                    return false;
                }
                true
            })
            .map(api_to_site)
            .collect())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let wrapper = self
            .client
            .search_advanced(&SearchRequest {
                site: query.site_id.clone(),
                query: query.query.clone(),
                tags: query.tags.clone(),
                page_size: query.page_size,
            })
            .await?;

        Ok(SearchResponse {
            questions: wrapper.items.into_iter().map(api_to_question).collect(),
            quota: wrapper
                .quota_remaining
                .map(|quota_remaining| QuotaInfo { quota_remaining }),
        })
    }

    async fn icon(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.client.download(url).await?)
    }
}

/// The API escapes HTML in names and titles
fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn api_to_site(site: ApiSite) -> Site {
    let is_meta = site.is_meta();
    Site {
        id: site.api_site_parameter,
        name: unescape(&site.name),
        audience: site.audience,
        icon_url: site.icon_url,
        is_meta,
    }
}

fn api_to_question(question: ApiQuestion) -> Question {
    Question {
        title: unescape(&question.title),
        link: question.link,
        tags: question.tags,
        is_answered: question.is_answered,
        score: question.score,
    }
}
