mod common;

use common::harness;
use reelkit_sync::entity::{Inspiration, Project, PromptSet, StoryboardFrame, ToolBlob};
use reelkit_sync::error::SyncError;
use reelkit_sync::sync::{AutoSave, SyncStatus, DEFAULT_QUIET_PERIOD};
use reelkit_sync::remote::SyncPayload;
use reelkit_sync::Module;
use serde_json::json;
use std::time::Duration;

fn touch(h: &common::Harness, module: Module) {
    match module {
        Module::Projects => {
            h.engine.save_project(Project::new("p")).unwrap();
        }
        Module::Inspirations => h.engine.save_inspiration(&Inspiration::new("i")).unwrap(),
        Module::Prompts => h.engine.save_prompts(&PromptSet::defaults()).unwrap(),
        Module::Tools => h
            .engine
            .save_tool(&ToolBlob {
                id: "voice".into(),
                data: json!({ "speed": 1 }),
            })
            .unwrap(),
    }
}

#[tokio::test]
async fn test_change_marks_module_unsaved() {
    for module in Module::ALL {
        let h = harness();
        assert!(h.engine.unsaved_modules().is_empty());

        touch(&h, module);

        assert_eq!(h.engine.unsaved_modules(), vec![module]);
    }
}

#[tokio::test]
async fn test_push_clears_dirty_bit() {
    for module in Module::ALL {
        let h = harness();
        touch(&h, module);

        h.engine.push_module(module).await.unwrap();

        assert!(!h.engine.unsaved_modules().contains(&module));
    }
}

#[tokio::test]
async fn test_change_without_clock_advance_is_still_dirty() {
    let h = harness();
    touch(&h, Module::Tools);
    h.engine.push_module(Module::Tools).await.unwrap();

    // same millisecond as the upload
    touch(&h, Module::Tools);
    assert_eq!(h.engine.unsaved_modules(), vec![Module::Tools]);
}

#[tokio::test]
async fn test_project_push_scenario() {
    let h = harness();

    let project = h.engine.save_project(Project::new("Intro to AI")).unwrap();
    assert!(h.engine.tracker().unsaved_labels().contains(&"项目数据"));

    h.engine.push_module(Module::Projects).await.unwrap();

    let pushes = h.remote.pushes();
    assert_eq!(pushes.len(), 1);
    let sent = pushes[0].projects.as_ref().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, project.id);
    assert_eq!(sent[0].title, "Intro to AI");
    assert!(pushes[0].inspirations.is_none());
    assert!(!h.engine.unsaved_modules().contains(&Module::Projects));
}

#[tokio::test]
async fn test_repeated_push_is_idempotent() {
    let h = harness();
    h.engine.save_project(Project::new("one")).unwrap();
    h.engine.save_project(Project::new("two")).unwrap();

    h.engine.push_module(Module::Projects).await.unwrap();
    let once = h.remote.db.snapshot().unwrap();
    h.engine.push_module(Module::Projects).await.unwrap();
    let twice = h.remote.db.snapshot().unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.projects.len(), 2);
}

#[tokio::test]
async fn test_pull_of_other_module_keeps_dirty_state() {
    let h = harness();
    h.engine.save_project(Project::new("local only")).unwrap();
    touch(&h, Module::Prompts);

    h.engine.pull_modules(&[Module::Prompts]).await.unwrap();

    assert_eq!(h.engine.unsaved_modules(), vec![Module::Projects]);
    assert_eq!(h.engine.local().list_projects().unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_pull_overwrites_and_marks_everything_synced() {
    let h = harness();
    let mut remote_project = Project::new("from remote");
    remote_project.id = "shared".into();
    h.remote
        .db
        .upsert(&SyncPayload {
            projects: Some(vec![remote_project.clone()]),
            ..Default::default()
        })
        .unwrap();

    let mut local_project = Project::new("local edit");
    local_project.id = "shared".into();
    h.engine.save_project(local_project).unwrap();
    touch(&h, Module::Tools);

    let summary = h.engine.pull().await.unwrap();

    assert_eq!(summary.projects, 1);
    assert!(h.engine.unsaved_modules().is_empty());
    let stored = h.engine.local().get_project("shared").unwrap().unwrap();
    assert_eq!(stored.title, "from remote");
}

#[tokio::test]
async fn test_pull_merges_prompts_over_defaults() {
    let h = harness();
    let mut remote_prompts = PromptSet::default();
    remote_prompts
        .0
        .insert("SCRIPT".into(), json!({ "template": "custom script" }));
    h.remote
        .db
        .upsert(&SyncPayload {
            prompts: Some(remote_prompts),
            ..Default::default()
        })
        .unwrap();

    let summary = h.engine.pull().await.unwrap();
    assert!(summary.prompts);

    let prompts = h.engine.local().get_prompts().unwrap();
    assert_eq!(prompts.get("SCRIPT").unwrap()["template"], "custom script");
    for key in ["TITLES", "SUMMARY", "COVER_GEN", "STORYBOARD_TEXT"] {
        assert_eq!(prompts.get(key), PromptSet::defaults().get(key), "{}", key);
    }
}

#[tokio::test]
async fn test_pull_without_remote_prompts_keeps_local_prompts() {
    let h = harness();
    let mut local = PromptSet::defaults();
    local.0.insert("SCRIPT".into(), json!({ "template": "mine" }));
    h.engine.save_prompts(&local).unwrap();

    let summary = h.engine.pull().await.unwrap();

    assert!(!summary.prompts);
    assert_eq!(h.engine.local().get_prompts().unwrap(), local);
}

#[tokio::test]
async fn test_failed_push_keeps_module_dirty() {
    let h = harness();
    h.engine.save_project(Project::new("offline edit")).unwrap();
    h.remote.set_offline(true);

    let err = h.engine.push_module(Module::Projects).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::UploadFailed {
            module: Module::Projects,
            ..
        }
    ));
    assert_eq!(h.engine.unsaved_modules(), vec![Module::Projects]);

    h.remote.set_offline(false);
    h.engine.push_module(Module::Projects).await.unwrap();
    assert!(h.engine.unsaved_modules().is_empty());
}

#[tokio::test]
async fn test_failed_pull_changes_nothing() {
    let h = harness();
    h.engine.save_project(Project::new("keep me")).unwrap();
    let change = h.engine.tracker().change_time(Module::Projects);
    h.remote.set_offline(true);

    let err = h.engine.pull().await.unwrap_err();

    assert!(matches!(err, SyncError::PullFailed { .. }));
    assert_eq!(h.engine.local().list_projects().unwrap().len(), 1);
    assert_eq!(h.engine.tracker().change_time(Module::Projects), change);
    assert_eq!(h.engine.unsaved_modules(), vec![Module::Projects]);
}

#[tokio::test]
async fn test_push_dirty_follows_upload_order() {
    let h = harness();
    touch(&h, Module::Tools);
    touch(&h, Module::Projects);

    let pushed = h.engine.push_dirty().await.unwrap();

    assert_eq!(pushed, vec![Module::Projects, Module::Tools]);
    assert_eq!(h.remote.pushes().len(), 2);
    assert!(h.engine.push_dirty().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_push_all_sends_every_module() {
    let h = harness();

    h.engine.push_all().await.unwrap();

    let pushes = h.remote.pushes();
    assert_eq!(pushes.len(), 4);
    assert!(pushes[0].projects.is_some());
    assert!(pushes[1].inspirations.is_some());
    assert!(pushes[2].tools.is_some());
    assert!(pushes[3].prompts.is_some());
}

#[tokio::test]
async fn test_inline_images_never_reach_the_remote() {
    let h = harness();
    let mut project = Project::new("storyboard");
    project.storyboard = vec![
        StoryboardFrame {
            id: "f1".into(),
            image_url: Some("data:image/png;base64,iVBORw0KGgo=".into()),
            ..Default::default()
        },
        StoryboardFrame {
            id: "f2".into(),
            image_url: Some("/api/images/p/f2.png".into()),
            ..Default::default()
        },
    ];
    h.engine.save_project(project).unwrap();

    h.engine.push_module(Module::Projects).await.unwrap();

    let sent = h.remote.pushes()[0].projects.clone().unwrap();
    assert_eq!(sent[0].storyboard[0].image_url, None);
    assert_eq!(
        sent[0].storyboard[1].image_url.as_deref(),
        Some("/api/images/p/f2.png")
    );
    let local = h.engine.local().list_projects().unwrap();
    assert!(local[0].storyboard[0].image_url.is_some());
}

#[tokio::test]
async fn test_offload_replaces_inline_cover() {
    let h = harness();
    let mut project = Project::new("cover");
    // "hello" in base64
    project.cover_image = Some("data:image/png;base64,aGVsbG8=".into());
    let project = h.engine.save_project(project).unwrap();

    let project = h.engine.offload_inline_images(project).await.unwrap();

    let cover = project.cover_image.clone().unwrap();
    let prefix = format!("/api/images/{}/", project.id);
    assert!(cover.starts_with(&prefix), "{}", cover);
    assert!(cover.ends_with(".png"));
    let key = cover.trim_start_matches("/api/images/");
    let blob = h.remote.db.get_blob(key).unwrap().unwrap();
    assert_eq!(blob.bytes, b"hello");
    assert_eq!(blob.content_type, "image/png");

    let stored = h.engine.local().get_project(&project.id).unwrap().unwrap();
    assert_eq!(stored.cover_image, Some(cover));
}

#[tokio::test]
async fn test_delete_project_reaches_remote() {
    let h = harness();
    let project = h.engine.save_project(Project::new("gone")).unwrap();
    h.engine.push_module(Module::Projects).await.unwrap();
    assert!(h.remote.db.get_project(&project.id).unwrap().is_some());

    assert!(h.engine.delete_project(&project.id).await.unwrap());

    assert!(h.remote.db.get_project(&project.id).unwrap().is_none());
    assert!(h.engine.local().get_project(&project.id).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_autosave_pushes_once_after_quiet_period() {
    let h = harness();
    h.clock.set(1_700_000_123_000);
    let autosave: AutoSave<Project> = AutoSave::spawn(
        h.engine.clone(),
        DEFAULT_QUIET_PERIOD,
        h.engine.tracker().clock(),
    );

    let mut project = Project::new("draft");
    for title in ["draft 1", "draft 2", "draft 3"] {
        project.title = title.into();
        autosave.edit(project.clone());
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    // last edit at t=6s
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(h.remote.pushes().is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    let pushes = h.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].projects.as_ref().unwrap()[0].title, "draft 3");
    let synced_at = chrono::DateTime::from_timestamp_millis(1_700_000_123_000).unwrap();
    assert_eq!(autosave.status(), SyncStatus::Synced { at: synced_at });
    assert!(h.engine.unsaved_modules().is_empty());
}

#[tokio::test]
async fn test_save_project_stamps_updated_at_from_clock() {
    let h = harness();
    h.clock.set(1_700_000_555_000);

    let saved = h.engine.save_project(Project::new("stamped")).unwrap();

    assert_eq!(saved.updated_at, 1_700_000_555_000);
    let stored = h.engine.local().get_project(&saved.id).unwrap().unwrap();
    assert_eq!(stored.updated_at, 1_700_000_555_000);
}

#[tokio::test]
async fn test_offline_delete_is_not_resurrected_by_push_and_pull() {
    let h = harness();
    let doomed = h.engine.save_project(Project::new("doomed")).unwrap();
    h.engine.save_project(Project::new("kept")).unwrap();
    h.engine.push_module(Module::Projects).await.unwrap();

    h.remote.set_offline(true);
    let err = h.engine.delete_project(&doomed.id).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::UploadFailed {
            module: Module::Projects,
            ..
        }
    ));
    assert!(h.engine.local().get_project(&doomed.id).unwrap().is_none());
    assert_eq!(
        h.engine.local().pending_deletes(Module::Projects).unwrap(),
        vec![doomed.id.clone()]
    );
    assert_eq!(h.engine.unsaved_modules(), vec![Module::Projects]);

    h.remote.set_offline(false);
    let pushed = h.engine.push_dirty().await.unwrap();
    assert_eq!(pushed, vec![Module::Projects]);
    assert!(h.remote.db.get_project(&doomed.id).unwrap().is_none());
    assert!(h.engine.local().pending_deletes(Module::Projects).unwrap().is_empty());

    let summary = h.engine.pull().await.unwrap();
    assert_eq!(summary.projects, 1);
    assert!(h.engine.local().get_project(&doomed.id).unwrap().is_none());
}

#[tokio::test]
async fn test_pull_sends_queued_delete_first() {
    let h = harness();
    let doomed = h.engine.save_project(Project::new("doomed")).unwrap();
    h.engine.push_module(Module::Projects).await.unwrap();

    h.remote.set_offline(true);
    assert!(h.engine.delete_project(&doomed.id).await.is_err());
    // still offline: the pull must not bring the row back
    assert!(matches!(
        h.engine.pull().await.unwrap_err(),
        SyncError::PullFailed { .. }
    ));
    assert!(h.engine.local().get_project(&doomed.id).unwrap().is_none());

    h.remote.set_offline(false);
    h.engine.pull().await.unwrap();

    assert!(h.engine.local().get_project(&doomed.id).unwrap().is_none());
    assert!(h.remote.db.get_project(&doomed.id).unwrap().is_none());
    assert!(h.engine.local().pending_deletes(Module::Projects).unwrap().is_empty());
}

#[tokio::test]
async fn test_partial_offload_keeps_uploaded_urls() {
    let h = harness();
    let mut project = Project::new("half done");
    project.cover_image = Some("data:image/png;base64,aGVsbG8=".into());
    project.storyboard = vec![StoryboardFrame {
        id: "f1".into(),
        image_url: Some("data:image/png;base64,!!!".into()),
        ..Default::default()
    }];
    let project = h.engine.save_project(project).unwrap();

    let err = h.engine.offload_inline_images(project.clone()).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidInlineData(_)));

    let stored = h.engine.local().get_project(&project.id).unwrap().unwrap();
    let cover = stored.cover_image.unwrap();
    assert!(cover.starts_with("/api/images/"), "{}", cover);
    let key = cover.trim_start_matches("/api/images/");
    assert_eq!(h.remote.db.get_blob(key).unwrap().unwrap().bytes, b"hello");
    assert_eq!(
        stored.storyboard[0].image_url.as_deref(),
        Some("data:image/png;base64,!!!")
    );
}
