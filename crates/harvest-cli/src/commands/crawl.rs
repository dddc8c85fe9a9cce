use anyhow::Context;
use harvest_github::GitHubClient;
use harvest_pipeline::{CrawlOptions, Crawler};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CrawlArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `harvest crawl`.
pub async fn handle(
    args: &CrawlArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let client = GitHubClient::new(&ctx.config.github).context("failed to build GitHub client")?;
    let crawler = Crawler::new(client, ctx.config.crawl.clone());
    let options = crawl_options(args, ctx);

    let mut ledger = ctx.repositories()?;
    let summary = crawler.crawl(&options, &mut ledger).await?;
    output(&summary, flags.format)
}

fn crawl_options(args: &CrawlArgs, ctx: &AppContext) -> CrawlOptions {
    CrawlOptions {
        star_threshold: args.stars.unwrap_or(ctx.config.crawl.star_threshold),
        force_refresh: args.force_tests,
        filters: if args.filters.is_empty() {
            ctx.config.crawl.search_filters.clone()
        } else {
            args.filters.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use harvest_config::HarvestConfig;

    use super::*;

    #[test]
    fn flags_override_configured_search() {
        let mut config = HarvestConfig::default();
        config.crawl.star_threshold = 3;
        config.crawl.search_filters = vec!["created:<2019-01-01".into()];
        let ctx = AppContext::new(config);

        let defaults = crawl_options(
            &CrawlArgs {
                stars: None,
                force_tests: false,
                filters: Vec::new(),
            },
            &ctx,
        );
        assert_eq!(defaults.star_threshold, 3);
        assert_eq!(defaults.filters, ["created:<2019-01-01"]);

        let overridden = crawl_options(
            &CrawlArgs {
                stars: Some(50),
                force_tests: true,
                filters: vec!["pushed:>2020-01-01".into()],
            },
            &ctx,
        );
        assert_eq!(overridden.star_threshold, 50);
        assert!(overridden.force_refresh);
        assert_eq!(overridden.filters, ["pushed:>2020-01-01"]);
    }
}
