//! Media command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use pvreg_core::{
    ClientId, MediaFilter, MediaLibrary, MediaTag, RegistryEntity, RegistryHost, ResumePoint,
};

use crate::cli::{GlobalOpts, MediaArgs, MediaCommand, MediaListArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MediaRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Client")]
    client: i32,
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Bin")]
    bin: &'static str,
    #[tabled(rename = "Plays")]
    plays: u32,
    #[tabled(rename = "Resume")]
    resume: String,
}

impl From<&Arc<MediaTag>> for MediaRow {
    fn from(t: &Arc<MediaTag>) -> Self {
        Self {
            id: surrogate(t),
            client: t.client_id().get(),
            uid: t.uid().to_owned(),
            title: t.title.clone(),
            kind: kind(t),
            bin: if t.is_deleted { "deleted" } else { "active" },
            plays: t.play_count,
            resume: t.resume_point.map(format_resume).unwrap_or_default(),
        }
    }
}

fn surrogate(t: &MediaTag) -> String {
    t.surrogate_id().map(|id| id.to_string()).unwrap_or_default()
}

fn kind(t: &MediaTag) -> &'static str {
    if t.is_radio { "radio" } else { "tv" }
}

fn format_resume(p: ResumePoint) -> String {
    format!("{:.0}/{:.0}s", p.position_secs, p.total_secs)
}

fn detail(t: &Arc<MediaTag>) -> String {
    let episode = match (t.season, t.episode) {
        (Some(s), Some(e)) => format!("S{s:02}E{e:02}"),
        _ => "-".into(),
    };
    output::detail_block(&[
        ("ID", surrogate(t)),
        ("Key", t.key().to_string()),
        ("Path", t.path()),
        ("Title", t.title.clone()),
        ("Kind", kind(t).into()),
        ("Type", t.media_type.to_string()),
        ("Episode", episode),
        ("Genre", util::join_or_dash(&t.genre)),
        ("Duration", format!("{}s", t.duration_secs)),
        ("Deleted", t.is_deleted.to_string()),
        ("Plays", t.play_count.to_string()),
        (
            "Resume",
            t.resume_point
                .map_or_else(|| "-".into(), format_resume),
        ),
    ])
}

fn filters(args: &MediaListArgs) -> Vec<MediaFilter> {
    let mut filters = vec![if args.deleted {
        MediaFilter::Deleted
    } else {
        MediaFilter::Active
    }];
    if let Some(client) = args.client {
        filters.push(MediaFilter::ByClient(ClientId(client)));
    }
    if args.tv {
        filters.push(MediaFilter::Tv);
    }
    if args.radio {
        filters.push(MediaFilter::Radio);
    }
    if args.unwatched {
        filters.push(MediaFilter::Unwatched);
    }
    if let Some(ref needle) = args.search {
        filters.push(MediaFilter::TitleContains(needle.clone()));
    }
    filters
}

// ── Stats ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MediaStats {
    tv: usize,
    radio: usize,
    deleted_tv: bool,
    deleted_radio: bool,
}

impl MediaStats {
    fn of(media: &MediaLibrary) -> Self {
        Self {
            tv: media.tv_count(),
            radio: media.radio_count(),
            deleted_tv: media.has_deleted_tv(),
            deleted_radio: media.has_deleted_radio(),
        }
    }
}

fn stats_detail(s: &MediaStats) -> String {
    output::detail_block(&[
        ("TV", s.tv.to_string()),
        ("Radio", s.radio.to_string()),
        ("Deleted TV", s.deleted_tv.to_string()),
        ("Deleted radio", s.deleted_radio.to_string()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    host: &RegistryHost,
    args: MediaArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let media = host.media();

    match args.command {
        MediaCommand::List(list) => {
            util::hydrate(media.registry(), list.refresh).await;
            let filters = filters(&list);
            let snap: Vec<Arc<MediaTag>> = media
                .list()
                .into_iter()
                .filter(|t| filters.iter().all(|f| f.matches(t)))
                .collect();
            let out = output::render_list(
                &global.format(),
                &snap,
                |t| MediaRow::from(t),
                |t| t.key().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MediaCommand::Get { item } => {
            util::hydrate(media.registry(), false).await;
            let found = util::resolve_media(media, &item)?;
            let out =
                output::render_single(&global.format(), &found, detail, |t| t.key().to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MediaCommand::Stats { refresh } => {
            util::hydrate(media.registry(), refresh).await;
            let stats = MediaStats::of(media);
            let out = output::render_single(&global.format(), &stats, stats_detail, |s| {
                format!("{} {}", s.tv, s.radio)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MediaCommand::PlayCount { item, count } => {
            util::hydrate(media.registry(), false).await;
            let found = util::resolve_media(media, &item)?;
            let updated = media.set_play_count(&found.key(), count).await?;
            print_updated(&updated, global)
        }

        MediaCommand::Watched { item, unset } => {
            util::hydrate(media.registry(), false).await;
            let found = util::resolve_media(media, &item)?;
            let updated = media.mark_watched(&found.key(), !unset).await?;
            print_updated(&updated, global)
        }

        MediaCommand::Resume {
            item,
            position,
            total,
        } => {
            if !(0.0..=total).contains(&position) || total <= 0.0 {
                return Err(CliError::Validation {
                    field: "position".into(),
                    reason: format!("{position} is outside 0..={total}"),
                });
            }
            util::hydrate(media.registry(), false).await;
            let found = util::resolve_media(media, &item)?;
            let point = ResumePoint {
                position_secs: position,
                total_secs: total,
            };
            let updated = media.set_resume_point(&found.key(), point).await?;
            print_updated(&updated, global)
        }

        MediaCommand::ResetResume { item } => {
            util::hydrate(media.registry(), false).await;
            let found = util::resolve_media(media, &item)?;
            let updated = media.reset_resume_point(&found.key()).await?;
            print_updated(&updated, global)
        }
    }
}

fn print_updated(tag: &Arc<MediaTag>, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.format(), tag, detail, |t| t.key().to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
