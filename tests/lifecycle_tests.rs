use std::sync::Arc;

use embed_preview::{
    Direction, EmbedConfig, EmbedEvent, EmbedMedia, Image, MediaItem, MetadataResult,
    PreviewKey, PreviewLifecycle, RenderOp, SizeClass, Status, SurvivingMarkup, SwapFile,
    VisualContent,
};

fn key() -> PreviewKey {
    PreviewKey { editor: 0, id: 1 }
}

fn lifecycle() -> PreviewLifecycle {
    lifecycle_with(EmbedConfig::default())
}

fn lifecycle_with(config: EmbedConfig) -> PreviewLifecycle {
    PreviewLifecycle::new(key(), Arc::new(config))
}

fn image(url: &str, width: Option<u32>) -> Image {
    Image {
        url: url.to_string(),
        width,
        height: None,
    }
}

fn metadata(images: Vec<Image>, embed_html: Option<&str>) -> MetadataResult {
    MetadataResult {
        title: Some("T".to_string()),
        description: Some("D".to_string()),
        provider_display: Some("P".to_string()),
        url: Some("http://x".to_string()),
        images,
        media: embed_html.map(|html| EmbedMedia {
            html: html.to_string(),
        }),
        original_url: Some("http://x".to_string()),
    }
}

fn success(meta: MetadataResult) -> EmbedEvent {
    EmbedEvent::Success { metadata: meta }
}

fn shown_image(ops: &[RenderOp]) -> Option<&str> {
    ops.iter().rev().find_map(|op| match op {
        RenderOp::ShowVisual {
            content: VisualContent::Image { url },
        } => Some(url.as_str()),
        _ => None,
    })
}

fn size_class(ops: &[RenderOp]) -> Option<SizeClass> {
    ops.iter().rev().find_map(|op| match op {
        RenderOp::SetSizeClass { class } => Some(*class),
        _ => None,
    })
}

#[test]
fn success_shows_widest_image_full_size_then_mini_after_next() {
    // Example 3: i2 (400) leads; one `next` lands on i1 (100), which is
    // thumbnail + mini under the default thresholds.
    let mut preview = lifecycle();
    let transition = preview.handle_event(&success(metadata(
        vec![image("i1", Some(100)), image("i2", Some(400))],
        None,
    )));

    assert_eq!(preview.status(), Status::Populated);
    assert!(!preview.is_clean());
    assert_eq!(shown_image(&transition.ops), Some("i2"));
    assert_eq!(size_class(&transition.ops), Some(SizeClass::Full));
    assert!(transition.ops.contains(&RenderOp::AttachNav));
    assert!(transition.ops.contains(&RenderOp::AttachMediaNav));
    assert!(transition.ops.contains(&RenderOp::AttachCycleControls));
    assert!(matches!(
        transition.emits.as_slice(),
        [EmbedEvent::MediaSelected { .. }]
    ));

    let next = preview.cycle_media(Direction::Next);
    assert_eq!(shown_image(&next.ops), Some("i1"));
    assert_eq!(size_class(&next.ops), Some(SizeClass::ThumbnailMini));
}

#[test]
fn success_renders_text_block_and_editor_side_effects() {
    let mut preview = lifecycle();
    let transition = preview.handle_event(&success(metadata(vec![], None)));

    assert!(transition.ops.contains(&RenderOp::HideSubmissionUi));
    assert!(transition.ops.contains(&RenderOp::ClearSelection));
    assert!(transition.ops.iter().any(|op| matches!(
        op,
        RenderOp::RenderText { title, description, attribution, url }
            if title == "T"
                && description == "D"
                && attribution.as_deref() == Some("P")
                && url.as_deref() == Some("http://x")
    )));
    // No media: no visual block, no media navigation.
    assert!(!transition.ops.contains(&RenderOp::AttachMediaNav));
    assert!(transition.emits.is_empty());
}

#[test]
fn missing_description_is_reported_as_error() {
    // Example 4.
    let mut preview = lifecycle();
    let mut incomplete = metadata(vec![], None);
    incomplete.description = None;
    let transition = preview.handle_event(&success(incomplete));

    assert!(transition.ops.is_empty());
    assert!(matches!(
        transition.emits.as_slice(),
        [EmbedEvent::Error { message }]
            if message == "This url has not enough metadata to create a preview."
    ));
    assert_eq!(preview.status(), Status::Pending);
}

#[test]
fn embeddable_media_leads_the_media_list() {
    let mut preview = lifecycle();
    let transition = preview.handle_event(&success(metadata(
        vec![image("i1", Some(500))],
        Some("<iframe></iframe>"),
    )));

    assert!(matches!(
        preview.media().first(),
        Some(MediaItem::Embed { .. })
    ));
    assert!(transition.ops.iter().any(|op| matches!(
        op,
        RenderOp::ShowVisual {
            content: VisualContent::EmbedHtml { html }
        } if html == "<iframe></iframe>"
    )));
    assert!(matches!(
        transition.emits.as_slice(),
        [EmbedEvent::MediaSelected {
            media: MediaItem::Embed { .. }
        }]
    ));
}

#[test]
fn lone_embed_has_no_cycling_and_no_media_notification() {
    let mut preview = lifecycle();
    let transition =
        preview.handle_event(&success(metadata(vec![], Some("<iframe></iframe>"))));

    assert!(!transition.ops.contains(&RenderOp::AttachCycleControls));
    assert!(transition.emits.is_empty());
    assert!(preview.cycle_media(Direction::Next).ops.is_empty());
}

#[test]
fn single_image_gets_no_cycle_controls() {
    let mut preview = lifecycle();
    let transition = preview.handle_event(&success(metadata(vec![image("only", None)], None)));
    assert!(!transition.ops.contains(&RenderOp::AttachCycleControls));
    assert!(preview.cycle_media(Direction::Next).ops.is_empty());
}

#[test]
fn media_cycling_wraps_both_directions() {
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(
        vec![
            image("a", Some(900)),
            image("b", Some(600)),
            image("c", Some(300)),
        ],
        None,
    )));
    assert_eq!(preview.media_index(), 0);

    preview.cycle_media(Direction::Next);
    preview.cycle_media(Direction::Next);
    assert_eq!(preview.media_index(), 2);
    // Next at the last index wraps to the front.
    preview.cycle_media(Direction::Next);
    assert_eq!(preview.media_index(), 0);
    // Previous at index 0 wraps to the back.
    let transition = preview.cycle_media(Direction::Previous);
    assert_eq!(preview.media_index(), 2);
    assert_eq!(shown_image(&transition.ops), Some("c"));
    assert!(matches!(
        transition.emits.as_slice(),
        [EmbedEvent::MediaSelected { .. }]
    ));
}

#[test]
fn swap_collapses_media_to_the_dropped_image() {
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(
        vec![image("a", Some(900)), image("b", Some(600))],
        Some("<iframe></iframe>"),
    )));

    let transition = preview.handle_event(&EmbedEvent::Swap {
        file: SwapFile {
            mime: "image/png".to_string(),
            url: "http://img/drop.png".to_string(),
        },
    });

    assert_eq!(shown_image(&transition.ops), Some("http://img/drop.png"));
    assert!(transition.ops.contains(&RenderOp::RemoveCycleControls));
    assert_eq!(preview.media().len(), 1);
    assert!(matches!(
        preview.media().first(),
        Some(MediaItem::Image(img)) if img.url == "http://img/drop.png"
    ));
    assert!(matches!(
        transition.emits.as_slice(),
        [EmbedEvent::MediaSelected { .. }]
    ));
}

#[test]
fn swap_rejects_non_image_files() {
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(vec![image("a", None)], None)));
    let transition = preview.handle_event(&EmbedEvent::Swap {
        file: SwapFile {
            mime: "video/mp4".to_string(),
            url: "http://clip".to_string(),
        },
    });
    assert!(transition.ops.is_empty());
    assert!(transition.emits.is_empty());
    assert_eq!(preview.media().len(), 1);
}

#[test]
fn remove_media_detaches_visual_and_notifies() {
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(
        vec![image("a", Some(900)), image("b", Some(600))],
        None,
    )));

    let transition = preview.remove_media();
    assert!(transition.ops.contains(&RenderOp::RemoveVisual));
    assert!(transition.ops.contains(&RenderOp::RemoveMediaNav));
    assert!(transition.ops.contains(&RenderOp::RemoveCycleControls));
    assert!(matches!(transition.emits.as_slice(), [EmbedEvent::NoMedia]));
    assert!(preview.media().is_empty());

    // Nothing left to remove.
    let repeat = preview.remove_media();
    assert!(repeat.ops.is_empty());
    assert!(repeat.emits.is_empty());
}

#[test]
fn cleanup_is_idempotent() {
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(vec![image("a", Some(500))], None)));

    let first = preview.cleanup();
    assert!(first.ops.contains(&RenderOp::RemoveNav));
    assert!(first.ops.contains(&RenderOp::ClearEditableFlags));
    assert!(first.ops.contains(&RenderOp::RemoveHelperMarkers));
    assert!(preview.is_clean());

    let second = preview.cleanup();
    assert!(second.ops.is_empty());
    assert!(second.emits.is_empty());
}

#[test]
fn cleanup_keeps_only_the_displayed_media() {
    // Embed displayed: the image alternates are pruned.
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(
        vec![image("a", Some(900))],
        Some("<iframe></iframe>"),
    )));
    let transition = preview.cleanup();
    assert!(transition
        .ops
        .contains(&RenderOp::PruneAlternateMedia {
            keep: embed_preview::MediaKind::Embed
        }));
    assert_eq!(preview.media().len(), 1);
    assert!(preview.media()[0].is_embed());

    // Image displayed: the embed alternative is pruned.
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(
        vec![image("a", Some(900))],
        Some("<iframe></iframe>"),
    )));
    preview.cycle_media(Direction::Next);
    let transition = preview.cleanup();
    assert!(transition
        .ops
        .contains(&RenderOp::PruneAlternateMedia {
            keep: embed_preview::MediaKind::Image
        }));
    assert!(matches!(
        preview.media().first(),
        Some(MediaItem::Image(img)) if img.url == "a"
    ));
}

#[test]
fn revive_requires_a_clean_preview() {
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(vec![], None)));
    let markup = SurvivingMarkup {
        marker: Some(1),
        url: "http://x".to_string(),
        embed_html: None,
        image_url: None,
    };
    let transition = preview.revive(&markup);
    assert!(transition.ops.is_empty());
    assert!(transition.emits.is_empty());
}

#[test]
fn cleanup_then_revive_reconstructs_unambiguous_media() {
    // Even when markup somehow carries both representations, the revived
    // record must not.
    let markup = SurvivingMarkup {
        marker: Some(1),
        url: "http://example.com/talk".to_string(),
        embed_html: Some("<iframe></iframe>".to_string()),
        image_url: Some("http://img/leftover.png".to_string()),
    };

    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(
        vec![image("a", Some(900))],
        Some("<iframe></iframe>"),
    )));
    preview.cleanup();
    let transition = preview.revive(&markup);

    assert_eq!(preview.status(), Status::Populated);
    assert!(!preview.is_clean());
    let success_payload = transition
        .emits
        .iter()
        .find_map(|event| match event {
            EmbedEvent::Success { metadata } => Some(metadata.clone()),
            _ => None,
        })
        .expect("revive re-emits success");
    // Never both representations at once; embedded markup wins.
    assert!(success_payload.media.is_some());
    assert!(success_payload.images.is_empty());
    assert_eq!(success_payload.url.as_deref(), Some("http://example.com/talk"));
    assert!(transition.ops.contains(&RenderOp::BindExisting { marker: Some(1) }));
    assert!(transition.ops.contains(&RenderOp::AttachNav));
}

#[test]
fn revive_from_image_markup_reports_single_image() {
    let markup = SurvivingMarkup {
        marker: None,
        url: "http://example.com/photo".to_string(),
        embed_html: None,
        image_url: Some("http://img/1.png".to_string()),
    };
    let mut preview = lifecycle();
    let transition = preview.revive(&markup);

    let success_payload = transition
        .emits
        .iter()
        .find_map(|event| match event {
            EmbedEvent::Success { metadata } => Some(metadata.clone()),
            _ => None,
        })
        .expect("revive re-emits success");
    assert!(success_payload.media.is_none());
    assert_eq!(success_payload.images.len(), 1);
    assert_eq!(success_payload.images[0].url, "http://img/1.png");
}

#[test]
fn revived_preview_ignores_its_own_success_echo() {
    let markup = SurvivingMarkup {
        marker: Some(1),
        url: "http://x".to_string(),
        embed_html: None,
        image_url: None,
    };
    let mut preview = lifecycle();
    let transition = preview.revive(&markup);
    let echo = transition
        .emits
        .iter()
        .find(|event| matches!(event, EmbedEvent::Success { .. }))
        .cloned()
        .expect("revive re-emits success");

    // The success notification comes back through the preview's own
    // subscription; it must not restart population.
    let bounced = preview.handle_event(&echo);
    assert!(bounced.ops.is_empty());
    assert!(bounced.emits.is_empty());
}

#[test]
fn error_then_success_still_populates_by_default() {
    let mut preview = lifecycle();
    let errored = preview.handle_event(&EmbedEvent::Error {
        message: "Not Found (404).".to_string(),
    });
    assert!(errored.ops.contains(&RenderOp::ShowError {
        message: "Not Found (404).".to_string()
    }));

    let transition = preview.handle_event(&success(metadata(vec![], None)));
    assert_eq!(preview.status(), Status::Populated);
    assert!(!transition.ops.is_empty());
}

#[test]
fn terminal_errors_latch_when_configured() {
    let mut preview = lifecycle_with(EmbedConfig::default().with_error_is_terminal(true));
    preview.handle_event(&EmbedEvent::Error {
        message: "Not Found (404).".to_string(),
    });

    let transition = preview.handle_event(&success(metadata(vec![], None)));
    assert!(transition.ops.is_empty());
    assert_eq!(preview.status(), Status::Pending);
}

#[test]
fn errors_render_only_when_display_is_enabled() {
    let mut preview = lifecycle_with(EmbedConfig::default().with_display_errors(false));
    let transition = preview.handle_event(&EmbedEvent::Error {
        message: "Not Found (404).".to_string(),
    });
    assert!(transition.ops.is_empty());
}

#[test]
fn progress_updates_only_while_pending() {
    let mut preview = lifecycle();
    let transition = preview.handle_event(&EmbedEvent::Progress { percent: 0.0 });
    assert_eq!(
        transition.ops,
        vec![RenderOp::SetProgress { percent: 0.0 }]
    );

    preview.handle_event(&success(metadata(vec![], None)));
    let after = preview.handle_event(&EmbedEvent::Progress { percent: 50.0 });
    assert!(after.ops.is_empty());
}

#[test]
fn destroy_is_terminal() {
    let mut preview = lifecycle();
    preview.handle_event(&success(metadata(vec![image("a", None)], None)));

    let transition = preview.destroy();
    assert_eq!(transition.ops, vec![RenderOp::RemovePreview]);
    assert!(matches!(transition.emits.as_slice(), [EmbedEvent::Removed]));
    assert_eq!(preview.status(), Status::Destroyed);

    assert!(preview.destroy().ops.is_empty());
    assert!(preview
        .handle_event(&success(metadata(vec![], None)))
        .ops
        .is_empty());
    assert!(preview.cleanup().ops.is_empty());
}
