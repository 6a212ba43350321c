//! One-shot sub-commands. Each prints its result to stdout and returns; the
//! backend is generic so the same code runs against REST and SQLite.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use skindex_core::{
  auth::User,
  catalog::{Catalog, CatalogSource},
  collapse::ExpandAll,
  facet::{Facet, FacetSelection, GroupMode},
  profile::{self, ProfileDraft, ProfileViewer},
  rarity::RarityOrder,
  session::Collection,
  store::Backend,
  view::{self, CardView, CatalogView},
};

use crate::config::Config;

/// Everything a command needs: the backend, who is acting, and settings.
pub struct Runner<B> {
  pub backend: Arc<B>,
  pub user:    Option<User>,
  pub config:  Config,
}

/// Filter flags of `list`.
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
  pub mode:       GroupMode,
  pub group:      Option<String>,
  pub theme:      Option<String>,
  pub rarity:     Option<String>,
  pub query:      Option<String>,
  pub only_owned: bool,
}

impl ListFilter {
  pub fn selection(&self) -> FacetSelection {
    let mut sel = match self.theme.as_deref() {
      Some(theme) => FacetSelection::for_theme(theme),
      None => FacetSelection {
        mode: self.mode,
        group: Facet::parse(self.group.as_deref()),
        ..FacetSelection::default()
      },
    };
    sel.rarity = Facet::parse(self.rarity.as_deref());
    sel.query = self.query.clone().unwrap_or_default();
    sel.only_owned = self.only_owned;
    sel
  }
}

/// Profile fields given on the command line; unset fields keep the current
/// draft value.
#[derive(Debug, Default, Clone)]
pub struct DraftEdits {
  pub display_name: Option<String>,
  pub bio:          Option<String>,
  pub is_public:    Option<bool>,
  pub show_owned:   Option<bool>,
}

impl DraftEdits {
  pub fn apply(self, mut draft: ProfileDraft) -> ProfileDraft {
    if let Some(v) = self.display_name {
      draft.display_name = v;
    }
    if let Some(v) = self.bio {
      draft.bio = v;
    }
    if let Some(v) = self.is_public {
      draft.is_public = v;
    }
    if let Some(v) = self.show_owned {
      draft.show_owned = v;
    }
    draft
  }
}

// ─── Rendering ────────────────────────────────────────────────────────────────

fn card_line(card: &CardView) -> String {
  let mark = match (card.editable, card.owned) {
    (_, true) => "[x]",
    (true, false) => "[ ]",
    (false, false) => "   ",
  };
  format!(
    "{mark} {:<32} {:<14} {:<20} {:<12} {}",
    card.name, card.brawler, card.theme, card.rarity, card.id
  )
}

pub fn render_view(view: &CatalogView) -> String {
  let mut out = Vec::new();
  match view {
    CatalogView::Flat(cards) => out.extend(cards.iter().map(card_line)),
    CatalogView::Grouped(sections) => {
      for section in sections {
        out.push(format!("## {} ({}/{})", section.theme, section.owned, section.total));
        if let Some(cards) = &section.cards {
          out.extend(cards.iter().map(card_line));
        }
      }
    }
  }
  out.push(format!("{} result(s)", view.result_count()));
  out.join("\n")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

// ─── Commands ─────────────────────────────────────────────────────────────────

impl<B: Backend + 'static> Runner<B> {
  async fn catalog(&self) -> Arc<Catalog> {
    let source = CatalogSource::new(self.backend.clone());
    let catalog = source.ready().await;
    if let Some(e) = source.last_error() {
      eprintln!("warning: catalog unavailable ({e}); continuing with an empty list");
    }
    catalog
  }

  async fn collection(&self) -> Result<Collection<B>> {
    let catalog = self.catalog().await;
    let collection = Collection::new(self.backend.clone(), catalog, RarityOrder::default());
    if let Some(user) = self.user.clone() {
      collection.sign_in(user).await.context("loading your collection")?;
    }
    Ok(collection)
  }

  fn require_user(&self) -> Result<&User> {
    match &self.user {
      Some(user) => Ok(user),
      None => bail!("not signed in; run `skindex login` first"),
    }
  }

  pub async fn list(&self, filter: &ListFilter, json: bool) -> Result<()> {
    let collection = self.collection().await?;
    let view = collection.view(&filter.selection(), &ExpandAll);
    if json {
      return print_json(&view);
    }
    println!("{}", render_view(&view));
    Ok(())
  }

  pub async fn set_owned(&self, ids: &[String], owned: bool) -> Result<()> {
    self.require_user()?;
    let collection = self.collection().await?;
    for id in ids {
      collection
        .set_owned(id, owned)
        .await
        .with_context(|| format!("updating {id}"))?;
      let name = collection
        .catalog()
        .get(id)
        .map(|i| i.name.as_str())
        .unwrap_or(id.as_str());
      println!("{} {name}", if owned { "owned:" } else { "not owned:" });
    }
    Ok(())
  }

  pub async fn stats(&self, json: bool) -> Result<()> {
    let collection = self.collection().await?;
    let stats = collection.stats();
    if json {
      return print_json(&stats);
    }
    println!("{} / {} owned ({}%)", stats.owned, stats.total, stats.percent_owned);
    for (rarity, count) in &stats.owned_by_rarity {
      println!("  {rarity:<12} {count}");
    }
    Ok(())
  }

  pub async fn profile_show(
    &self,
    user_param: Option<&str>,
    rarity: Option<&str>,
    query: Option<&str>,
    json: bool,
  ) -> Result<()> {
    let target = profile::resolve_target(user_param, self.user.as_ref())?;
    let viewer = ProfileViewer::new(self.backend.clone(), self.catalog().await);
    let page = viewer.open(&target).await?;

    let cards = view::profile_cards(
      viewer.catalog(),
      &page.owned_ids,
      &Facet::parse(rarity),
      query.unwrap_or_default(),
      &RarityOrder::default(),
    );

    if json {
      return print_json(&serde_json::json!({ "profile": page, "cards": cards }));
    }

    let p = &page.profile;
    println!("{}", p.display_name_or_default());
    if let Some(bio) = p.bio.as_deref().filter(|b| !b.trim().is_empty()) {
      println!("{bio}");
    }
    println!("{}", p.visibility().describe());
    if p.show_owned {
      println!("{} / {} owned ({}%)", page.owned(), page.total, page.percent_owned);
      for card in &cards {
        println!("{}", card_line(card));
      }
    }
    Ok(())
  }

  pub async fn profile_save(&self, edits: DraftEdits) -> Result<()> {
    self.require_user()?;
    let collection = self.collection().await?;
    let draft = edits.apply(collection.draft()?);
    let saved = collection.save_profile(draft).await?;
    println!("Profile saved: {}", saved.display_name_or_default());
    println!("{}", saved.visibility().describe());
    Ok(())
  }

  pub fn profile_link(&self) -> Result<()> {
    let user = self.require_user()?;
    println!("{}", profile::share_url(&self.config.profile_page_url, &user.id)?);
    Ok(())
  }

  pub async fn profile_search(&self, name: &str) -> Result<()> {
    let viewer = ProfileViewer::new(self.backend.clone(), Arc::new(Catalog::default()));
    let hits = viewer.search(name).await?;
    if hits.is_empty() {
      println!("No public profile found.");
      return Ok(());
    }
    for p in &hits {
      println!("{:<24} {}", p.display_name_or_default(), p.user_id);
    }
    Ok(())
  }

  pub async fn publish(&self, edits: DraftEdits) -> Result<()> {
    let user = self.require_user()?;
    let collection = self.collection().await?;
    let draft = edits.apply(collection.draft()?);
    match collection.publish(draft).await {
      Ok(report) => {
        println!("Published {} item(s).", report.published);
        println!("{}", profile::share_url(&self.config.profile_page_url, &user.id)?);
        Ok(())
      }
      Err(e) if e.snapshot_cleared() => {
        Err(anyhow::Error::new(e).context("your public list is now empty; run `publish` again"))
      }
      Err(e) => Err(e.into()),
    }
  }
}
