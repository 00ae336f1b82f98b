//! Tool for fetching recent company news

use agent_core::Result as AgentResult;
use agent_tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::normalize_symbol;
use crate::cache::CacheKey;
use crate::capability::Capability;
use crate::error::{FinanceError, Result};
use crate::tools::ToolContext;

const MAX_STORIES: usize = 20;

/// Recent news stories for a symbol
pub struct CompanyNewsTool {
    ctx: ToolContext,
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    symbol: String,
    #[serde(default)]
    num_stories: Option<usize>,
}

impl CompanyNewsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn fetch_news(&self, params: NewsParams) -> Result<Value> {
        let symbol = normalize_symbol(&params.symbol)?;
        let count = params
            .num_stories
            .unwrap_or(self.ctx.config.default_news_count)
            .clamp(1, MAX_STORIES);
        let key = CacheKey::new(&symbol, "company_news", &json!({ "count": count }));

        self.ctx
            .cache
            .news
            .get_or_fetch(key, || async {
                let mut stories = self.ctx.source.news(&symbol, count).await?;
                stories.truncate(count);

                let articles: Vec<Value> = stories
                    .iter()
                    .map(|story| {
                        json!({
                            "title": story.title,
                            "publisher": story.publisher,
                            "link": story.link,
                            "published_at": story.published_at.map(|t| t.to_rfc3339()),
                        })
                    })
                    .collect();

                Ok::<_, FinanceError>(json!({
                    "symbol": &symbol,
                    "news_count": articles.len(),
                    "articles": articles,
                }))
            })
            .await
    }
}

#[async_trait]
impl Tool for CompanyNewsTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: NewsParams = serde_json::from_value(params)
            .map_err(|e| agent_core::Error::ProcessingFailed(format!("Invalid parameters: {e}")))?;

        self.fetch_news(params)
            .await
            .map_err(|e| e.into_tool_error(self.name()))
    }

    fn name(&self) -> &'static str {
        Capability::CompanyNews.function_name()
    }

    fn description(&self) -> &'static str {
        "Get the most recent news stories about a company: headline, publisher, link and \
         publication time."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Stock ticker symbol"
                },
                "num_stories": {
                    "type": "integer",
                    "description": "Number of stories to return (default 3)",
                    "minimum": 1,
                    "maximum": MAX_STORIES
                }
            },
            "required": ["symbol"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NewsItem;
    use crate::api::source::MockMarketDataSource;
    use crate::config::FinanceToolsConfig;
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn story(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            publisher: Some("Reuters".to_string()),
            link: None,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_default_story_count() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_news()
            .with(eq("NVDA"), eq(3))
            .times(1)
            .returning(|_, _| Ok(vec![story("a"), story("b"), story("c"), story("d")]));
        let tool = CompanyNewsTool::new(crate::tools::ToolContext::new(
            Arc::new(source),
            &FinanceToolsConfig::default(),
        ));

        let value = tool.execute(json!({"symbol": "NVDA"})).await.unwrap();
        assert_eq!(value["news_count"], 3);
        assert_eq!(value["articles"][0]["publisher"], "Reuters");
    }

    #[tokio::test]
    async fn test_story_count_is_clamped() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_news()
            .with(eq("NVDA"), eq(MAX_STORIES))
            .returning(|_, _| Ok(Vec::new()));
        let tool = CompanyNewsTool::new(crate::tools::ToolContext::new(
            Arc::new(source),
            &FinanceToolsConfig::default(),
        ));

        let value = tool
            .execute(json!({"symbol": "NVDA", "num_stories": 500}))
            .await
            .unwrap();
        assert_eq!(value["news_count"], 0);
    }

    #[test]
    fn test_invalid_story_count() {
        let tool = CompanyNewsTool::new(crate::tools::ToolContext::new(
            Arc::new(MockMarketDataSource::new()),
            &FinanceToolsConfig::default(),
        ));
        let err = tokio_test::block_on(tool.execute(json!({"symbol": "NVDA", "num_stories": "three"})))
            .unwrap_err();
        assert!(matches!(err, agent_core::Error::ProcessingFailed(_)));
    }

    #[test]
    fn test_tool_metadata() {
        let tool = CompanyNewsTool::new(crate::tools::ToolContext::new(
            Arc::new(MockMarketDataSource::new()),
            &FinanceToolsConfig::default(),
        ));
        assert_eq!(tool.name(), "get_company_news");
        assert_eq!(tool.input_schema()["required"][0], "symbol");
    }
}
