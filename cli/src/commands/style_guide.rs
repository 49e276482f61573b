//! `orbit style-guide` — seed the sign-off style guide pages.
//!
//! Installs a private page tree from the embedded templates: a `styleguide`
//! parent plus one child per template, with the patterns page extended by
//! every block pattern the theme registers. Existing pages are only
//! overwritten after confirmation (or unconditionally with `--force`).

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use crate::app::AppContext;
use crate::project::Project;
use crate::templates::{StyleGuideTemplate, style_guide_templates};
use crate::tools::wp::{WpCli, WpCliProcess};
use crate::tools::{require_success, stdout_text};

const PARENT_SLUG: &str = "styleguide";
const PARENT_TITLE: &str = "Style Guide";

/// Dumps every registered block pattern as JSON for the patterns page.
const PATTERNS_SNIPPET: &str = "echo wp_json_encode(array_values(array_map(function ($pattern) { return ['title' => $pattern['title'], 'description' => $pattern['description'] ?? '', 'content' => $pattern['content']]; }, WP_Block_Patterns_Registry::get_instance()->get_all_registered())));";

/// Arguments for the `orbit style-guide` command.
#[derive(Args)]
pub struct StyleGuideArgs {
    /// Overwrite existing pages without asking for confirmation
    #[arg(long)]
    pub force: bool,
}

/// Run `orbit style-guide`.
///
/// # Errors
///
/// Returns an error when WP-CLI cannot be found or a page operation fails.
pub async fn run(args: &StyleGuideArgs, app: &AppContext) -> Result<()> {
    let project = Project::current()?;
    let wp = WpCliProcess::locate(app.runner, &project).await?;
    seed_style_guide(&wp, app, args.force).await
}

async fn seed_style_guide(wp: &impl WpCli, app: &AppContext, force: bool) -> Result<()> {
    let ctx = &app.output;
    let parent_id = prepare_parent_page(wp).await?;

    for template in style_guide_templates() {
        let Some(page_id) = resolve_page(wp, app, &template.slug, force).await? else {
            ctx.info(&format!("Skipping /{}", template.slug));
            continue;
        };
        let body = page_body(wp, &template).await?;
        update_page(wp, page_id, parent_id, &template.title, &body).await?;
        ctx.info(&format!("Seeded /{}", template.slug));
    }

    write_parent_index(wp, parent_id).await?;
    ctx.success("Style guide pages are ready.");
    Ok(())
}

// ── Page plumbing ─────────────────────────────────────────────────────────────

/// The parent page is always refreshed, never prompted for.
async fn prepare_parent_page(wp: &impl WpCli) -> Result<u64> {
    let parent_id = match find_page(wp, PARENT_SLUG).await? {
        Some(id) => id,
        None => create_page(wp, PARENT_SLUG).await?,
    };
    let id_arg = parent_id.to_string();
    let title = format!("--post_title={PARENT_TITLE}");
    let output = wp
        .run(&["post", "update", &id_arg, &title, "--post_status=private", "--post_parent=0"])
        .await?;
    require_success("wp post update (style guide parent)", output)?;
    Ok(parent_id)
}

/// Find the page for `slug`, or create it. Returns `None` when the page
/// exists and the user declines to overwrite it.
async fn resolve_page(
    wp: &impl WpCli,
    app: &AppContext,
    slug: &str,
    force: bool,
) -> Result<Option<u64>> {
    if let Some(id) = find_page(wp, slug).await? {
        if !force {
            let overwrite = app.confirm(
                &format!("Page \"/{slug}\" already exists. Overwrite with new content?"),
                true,
            )?;
            if !overwrite {
                return Ok(None);
            }
        }
        return Ok(Some(id));
    }
    create_page(wp, slug).await.map(Some)
}

async fn find_page(wp: &impl WpCli, slug: &str) -> Result<Option<u64>> {
    let name = format!("--name={slug}");
    let output = wp
        .run(&[
            "post",
            "list",
            "--post_type=page",
            &name,
            "--post_status=publish,private,draft",
            "--field=ID",
        ])
        .await?;
    let output = require_success("wp post list", output)?;
    let text = stdout_text(&output);
    let Some(first) = text.lines().next() else {
        return Ok(None);
    };
    let id = first
        .trim()
        .parse::<u64>()
        .with_context(|| format!("unexpected page ID from wp post list: {first:?}"))?;
    Ok(Some(id))
}

async fn create_page(wp: &impl WpCli, slug: &str) -> Result<u64> {
    let name = format!("--post_name={slug}");
    let output = wp
        .run(&["post", "create", "--post_type=page", &name, "--porcelain"])
        .await?;
    let output = require_success("wp post create", output)?;
    let text = stdout_text(&output);
    text.parse::<u64>()
        .with_context(|| format!("unexpected page ID from wp post create: {text:?}"))
}

async fn update_page(
    wp: &impl WpCli,
    page_id: u64,
    parent_id: u64,
    title: &str,
    body: &str,
) -> Result<()> {
    let id_arg = page_id.to_string();
    let title_arg = format!("--post_title={title}");
    let parent_arg = format!("--post_parent={parent_id}");
    let output = wp
        .run_with_stdin(
            &["post", "update", &id_arg, "-", &title_arg, "--post_status=private", &parent_arg],
            body.as_bytes(),
        )
        .await?;
    require_success(&format!("wp post update {page_id}"), output)?;
    Ok(())
}

// ── Page content ──────────────────────────────────────────────────────────────

async fn page_body(wp: &impl WpCli, template: &StyleGuideTemplate) -> Result<String> {
    let mut body = template.body.to_string();
    if template.slug == "patterns" {
        body.push_str(&registered_patterns_markup(wp).await?);
    }
    Ok(body)
}

#[derive(Deserialize)]
struct BlockPattern {
    title: String,
    #[serde(default)]
    description: String,
    content: String,
}

async fn registered_patterns_markup(wp: &impl WpCli) -> Result<String> {
    let output = wp.run(&["eval", PATTERNS_SNIPPET]).await?;
    let output = require_success("wp eval (pattern dump)", output)?;
    let patterns: Vec<BlockPattern> =
        serde_json::from_slice(&output.stdout).context("could not parse the pattern dump")?;
    Ok(patterns_markup(&patterns))
}

fn patterns_markup(patterns: &[BlockPattern]) -> String {
    if patterns.is_empty() {
        return "<!-- wp:paragraph {\"className\":\"\"} --><p>This website has no patterns.</p><!-- /wp:paragraph -->".to_string();
    }

    let mut markup = String::new();
    for pattern in patterns {
        markup.push_str(&format!(
            "<!-- wp:heading {{\"level\":2,\"className\":\"\"}} --><h2 class=\"wp-block-heading\">{}</h2><!-- /wp:heading -->",
            pattern.title
        ));
        if !pattern.description.is_empty() {
            markup.push_str(&format!(
                "<!-- wp:paragraph {{\"className\":\"\"}} --><p>{}</p><!-- /wp:paragraph -->",
                pattern.description
            ));
        }
        markup.push('\n');
        markup.push_str(&pattern.content);
        markup.push('\n');
    }
    markup
}

// ── Parent index ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChildPage {
    #[serde(rename = "ID")]
    id: u64,
    post_title: String,
}

/// Rewrite the parent body as an intro plus a list of links to every child.
async fn write_parent_index(wp: &impl WpCli, parent_id: u64) -> Result<()> {
    let parent_arg = format!("--post_parent={parent_id}");
    let output = wp
        .run(&[
            "post",
            "list",
            "--post_type=page",
            &parent_arg,
            "--post_status=publish,private",
            "--fields=ID,post_title",
            "--format=json",
        ])
        .await?;
    let output = require_success("wp post list (style guide children)", output)?;
    let children: Vec<ChildPage> =
        serde_json::from_slice(&output.stdout).context("could not parse the page list")?;

    let mut links = Vec::with_capacity(children.len());
    for child in children {
        let id_arg = child.id.to_string();
        let output = wp.run(&["post", "url", &id_arg]).await?;
        let output = require_success("wp post url", output)?;
        links.push((child.post_title, stdout_text(&output)));
    }

    let id_arg = parent_id.to_string();
    let output = wp
        .run_with_stdin(
            &["post", "update", &id_arg, "-"],
            parent_index_markup(&links).as_bytes(),
        )
        .await?;
    require_success("wp post update (style guide index)", output)?;
    Ok(())
}

fn parent_index_markup(links: &[(String, String)]) -> String {
    let mut content = String::from(
        "<!-- wp:paragraph {\"className\":\"\"} -->\
         <p>This page and it's children serve the purpose of allowing the website's team to validate the website's styles and content blocks. They are automatically generated so if you edit them please be aware that the changes may be overwritten in the future. </p>\
         <!-- /wp:paragraph -->\
         <!-- wp:list {\"className\":\"\"} -->\
         <ul>",
    );
    for (title, url) in links {
        content.push_str(&format!(
            "<!-- wp:list-item {{\"className\":\"\"}} --><li><a href=\"{url}\">{title}</a></li><!-- /wp:list-item -->"
        ));
    }
    content.push_str("</ul><!-- /wp:list -->");
    content
}

// ── Tests ─────────────────────────────────────────────────────────────────────
