//! Integration tests for gallery management

mod common;

use common::{dev_app, TestApp};
use lantern::content::gallery::{photos_collection, GroupMeta, NewGroup, PhotoMeta, UploadFile};
use lantern::objects::{photo_object_path, ObjectStore};
use lantern::content::UploadStatus;
use lantern::render::gallery_group_view;
use lantern::store::DocumentStore;
use lantern::types::SiteError;
use serde_json::{json, Value};

fn file(name: &str) -> UploadFile {
    UploadFile {
        file_name: name.to_string(),
        data: name.as_bytes().repeat(100),
    }
}

async fn group_with_photos(app: &TestApp, title: &str, files: &[&str]) -> String {
    let group = app
        .state
        .gallery
        .create_group(NewGroup {
            title: title.to_string(),
            date: Some("2024-05-01".to_string()),
        })
        .await
        .unwrap();
    let outcomes = app
        .state
        .gallery
        .upload_photos(&group.id, files.iter().map(|f| file(f)).collect())
        .await
        .unwrap();
    assert!(outcomes.iter().all(|o| o.error.is_none()));
    group.id
}

#[tokio::test]
async fn test_create_group_defaults() {
    let app = dev_app().await;
    let group = app
        .state
        .gallery
        .create_group(NewGroup {
            title: "Spring Fair".into(),
            date: None,
        })
        .await
        .unwrap();
    assert_eq!(group.description, "Spring Fair highlights");
    assert_eq!(group.date, lantern::content::today());

    let fetched = app.state.gallery.get_group(&group.id).await.unwrap();
    assert_eq!(fetched, group);

    let missing = app
        .state
        .gallery
        .create_group(NewGroup::default())
        .await;
    assert!(matches!(missing, Err(SiteError::InvalidInput(_))));
}

#[tokio::test]
async fn test_uploads_are_named_and_ordered() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Spring Fair", &["a.jpg", "b.jpg"]).await;

    let outcomes = app
        .state
        .gallery
        .upload_photos(&gid, vec![file("c.jpg")])
        .await
        .unwrap();
    assert_eq!(outcomes[0].photo.as_ref().unwrap().name, "Spring Fair 3");

    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    let summary: Vec<(&str, Option<i64>)> =
        photos.iter().map(|p| (p.name.as_str(), p.order)).collect();
    assert_eq!(
        summary,
        vec![
            ("Spring Fair 1", Some(0)),
            ("Spring Fair 2", Some(1)),
            ("Spring Fair 3", Some(2)),
        ]
    );
    assert!(photos.iter().all(|p| p.caption.is_empty()));
    assert!(photos[0].url.starts_with("http://localhost:8080/objects/galleryGroups/"));

    let progress = app.state.gallery.uploads().list(Some(&gid));
    assert_eq!(progress.len(), 3);
    assert!(progress
        .iter()
        .all(|p| p.status == UploadStatus::Done && p.progress == 100));
}

#[tokio::test]
async fn test_partial_upload_failure() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Picnic", &[]).await;
    app.objects.refuse_put_of("bad.jpg");

    let outcomes = app
        .state
        .gallery
        .upload_photos(&gid, vec![file("good.jpg"), file("bad.jpg")])
        .await
        .unwrap();
    assert!(outcomes[0].photo.is_some());
    assert!(outcomes[1].error.is_some());

    let failed = app.state.gallery.uploads().get(&outcomes[1].id).unwrap();
    assert_eq!(failed.status, UploadStatus::Error);

    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].file_name, "good.jpg");
}

#[tokio::test]
async fn test_remove_group_is_one_batch_and_tolerates_storage_failure() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Gala", &["one.jpg", "two.jpg"]).await;
    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    app.objects.refuse_delete_of(&photos[0].url);
    app.store.clear_log();

    let report = app.state.gallery.remove_group(&gid).await.unwrap();
    assert_eq!(report.photos_deleted, 2);
    assert_eq!(report.objects_deleted, 1);
    assert_eq!(report.objects_failed, 1);

    let batches = app.store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[0].delete_count(), 3);
    assert_eq!(app.objects.deleted().len(), 1);

    assert!(matches!(
        app.state.gallery.get_group(&gid).await,
        Err(SiteError::NotFound(_))
    ));
    let remaining = app
        .store
        .list(&photos_collection(&gid), None)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_missing_orders_are_normalized_by_admin_load_only() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Archive", &[]).await;
    let photos_path = photos_collection(&gid);
    for id in ["p1", "p2"] {
        let body = json!({ "url": format!("http://x/{}.jpg", id), "name": id });
        let Value::Object(doc) = body else { unreachable!() };
        app.store.set(&photos_path.doc(id), doc, false).await.unwrap();
    }
    app.store.clear_log();

    // The public view reads without writing
    let view = gallery_group_view(app.store.as_ref(), &gid).await.unwrap();
    assert_eq!(view.photos.len(), 2);
    assert!(app.store.batches().is_empty());

    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    assert_eq!(
        photos.iter().map(|p| p.order).collect::<Vec<_>>(),
        vec![Some(0), Some(1)]
    );
    assert_eq!(app.store.batches().len(), 1);

    let stored = app.store.get(&photos_path.doc("p2")).await.unwrap().unwrap();
    assert_eq!(stored["order"], json!(1));

    // Already normalized: nothing written the second time
    app.store.clear_log();
    app.state.gallery.load_photos(&gid).await.unwrap();
    assert!(app.store.batches().is_empty());
}

#[tokio::test]
async fn test_photo_order_and_metadata() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Walk", &["a.jpg", "b.jpg", "c.jpg"]).await;
    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    let reversed: Vec<String> = photos.iter().rev().map(|p| p.id.clone()).collect();

    app.state
        .gallery
        .save_photo_order(&gid, &reversed)
        .await
        .unwrap();
    app.state
        .gallery
        .save_photo(
            &gid,
            &reversed[0],
            PhotoMeta {
                caption: Some("Finish line".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    let ids: Vec<String> = photos.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, reversed);
    assert_eq!(photos[0].caption, "Finish line");
    assert_eq!(photos[0].name, "Walk 3");
    assert_eq!(photos[0].file_name, "c.jpg");

    app.state.gallery.remove_photo(&gid, &ids[1]).await.unwrap();
    assert_eq!(app.state.gallery.load_photos(&gid).await.unwrap().len(), 2);
    assert_eq!(app.objects.deleted().len(), 1);

    let missing = app
        .state
        .gallery
        .save_photo(&gid, "nope", PhotoMeta::default())
        .await;
    assert!(matches!(missing, Err(SiteError::NotFound(_))));
}

#[tokio::test]
async fn test_photo_order_must_be_a_permutation() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Market", &["a.jpg", "b.jpg"]).await;
    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    let a = photos[0].id.clone();
    let b = photos[1].id.clone();
    app.store.clear_log();

    for bad in [
        vec!["typo-id".to_string()],
        vec![a.clone()],
        vec![a.clone(), a.clone()],
        vec![a.clone(), b.clone(), "extra".to_string()],
    ] {
        let result = app.state.gallery.save_photo_order(&gid, &bad).await;
        assert!(matches!(result, Err(SiteError::InvalidInput(_))), "{:?}", bad);
    }
    assert!(app.store.batches().is_empty());

    let photos = app.state.gallery.load_photos(&gid).await.unwrap();
    let summary: Vec<(&str, Option<i64>)> =
        photos.iter().map(|p| (p.id.as_str(), p.order)).collect();
    assert_eq!(summary, vec![(a.as_str(), Some(0)), (b.as_str(), Some(1))]);

    app.state
        .gallery
        .save_photo_order(&gid, &[b.clone(), a.clone()])
        .await
        .unwrap();
    let ids: Vec<String> = app
        .state
        .gallery
        .load_photos(&gid)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![b, a]);
}

#[tokio::test]
async fn test_partial_group_meta_keeps_other_fields() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Parade", &[]).await;

    let saved = app
        .state
        .gallery
        .save_group_meta(
            &gid,
            GroupMeta {
                description: Some("Floats and bands".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(saved.title, "Parade");
    assert_eq!(saved.date, "2024-05-01");
    assert_eq!(saved.description, "Floats and bands");

    let missing = app
        .state
        .gallery
        .save_group_meta("nope", GroupMeta::default())
        .await;
    assert!(matches!(missing, Err(SiteError::NotFound(_))));
}

#[tokio::test]
async fn test_failed_photo_write_removes_stored_object() {
    let app = dev_app().await;
    let gid = group_with_photos(&app, "Concert", &[]).await;
    app.store.fail_commits(true);

    let outcomes = app
        .state
        .gallery
        .upload_photos(&gid, vec![file("stage.jpg")])
        .await
        .unwrap();
    assert!(outcomes[0].error.is_some());

    let path = photo_object_path(&gid, &outcomes[0].id, "stage.jpg");
    assert_eq!(app.objects.deleted(), vec![path.clone()]);
    assert!(matches!(
        app.objects.get(&path).await,
        Err(SiteError::NotFound(_))
    ));

    app.store.fail_commits(false);
    assert!(app.state.gallery.load_photos(&gid).await.unwrap().is_empty());
}
