mod support;

use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use support::{read_json, with_songs_harness};

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn unfiltered_listing_returns_all_rows_by_id() {
    with_songs_harness(|harness| async move {
        let (status, body) = read_json(harness.get("/songs?page_size=50").await).await;

        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["total"], json!(4));
        assert_eq!(body["totalPages"], json!(1));
        assert_eq!(body["page"], json!(1));
        assert_eq!(body["page_size"], json!(50));

        let ids: Vec<i64> = body["items"]
            .as_array()
            .expect("items should be an array")
            .iter()
            .filter_map(|item| item["ID"].as_i64())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids, sorted);
        assert_eq!(body["items"][0]["group"], json!("Muse"));
        assert_eq!(body["items"][0]["song"], json!("Supermassive Black Hole"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn listing_paginates_and_rejects_overflow() {
    with_songs_harness(|harness| async move {
        let (status, body) = read_json(harness.get("/songs?page=2&page_size=3").await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["totalPages"], json!(2));
        assert_eq!(body["items"][0]["song"], json!("Alphabet"));

        let (status, body) = read_json(harness.get("/songs?page=3&page_size=3").await).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!("Error"));
        assert_eq!(
            body["message"],
            json!("requested page 3 exceeds total pages (2)")
        );
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn invalid_page_params_fall_back_to_defaults() {
    with_songs_harness(|harness| async move {
        let (status, body) = read_json(harness.get("/songs?page=zero&page_size=-1").await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["page"], json!(1));
        assert_eq!(body["page_size"], json!(10));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn group_and_title_filters_are_case_insensitive_and_combined() {
    with_songs_harness(|harness| async move {
        let (_, body) = read_json(harness.get("/songs?group=mUSE").await).await;
        assert_eq!(body["total"], json!(2));

        let (_, body) = read_json(harness.get("/songs?group=muse&song=HYST").await).await;
        assert_eq!(body["total"], json!(1));
        assert_eq!(body["items"][0]["song"], json!("Hysteria"));

        let (status, body) = read_json(harness.get("/songs?group=nobody").await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["total"], json!(0));
        assert_eq!(body["totalPages"], json!(1));
        assert_eq!(body["items"], json!([]));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn added_song_is_found_by_id() {
    with_songs_harness(|harness| async move {
        let (status, body) = read_json(
            harness
                .post_json("/songs", json!({ "group": "Radiohead", "song": "Creep" }))
                .await,
        )
        .await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["status"], json!("Success"));
        let id = body["data"]["ID"].as_i64().expect("new song should have an id");
        assert!(id > 0);
        assert_eq!(body["data"]["group"], json!("Radiohead"));
        assert!(body["data"].get("text").is_none());

        let (_, listed) = read_json(harness.get(&format!("/songs?id={id}")).await).await;
        assert_eq!(listed["total"], json!(1));
        assert_eq!(listed["items"][0]["ID"], json!(id));
        assert_eq!(listed["items"][0]["group"], json!("Radiohead"));
        assert_eq!(listed["items"][0]["song"], json!("Creep"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn delete_removes_row_and_reports_missing_ids() {
    with_songs_harness(|harness| async move {
        let id = harness.id_of("Hysteria").await;

        let (status, body) = read_json(harness.delete(&format!("/songs?id={id}")).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body, json!({ "status": "Success", "message": "Song deleted" }));

        let (_, listed) = read_json(harness.get(&format!("/songs?id={id}")).await).await;
        assert_eq!(listed["total"], json!(0));

        let (status, body) = read_json(harness.delete(&format!("/songs?id={id}")).await).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!(format!("not found: song {id}")));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn partial_update_keeps_untouched_fields() {
    with_songs_harness(|harness| async move {
        let id = harness.id_of("Bohemian Rhapsody").await;

        let (status, body) = read_json(
            harness
                .patch_json(&format!("/songs?id={id}"), json!({ "group": "Queen II" }))
                .await,
        )
        .await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({ "ID": id, "group": "Queen II", "song": "Bohemian Rhapsody" })
        );

        let (status, body) = read_json(
            harness
                .patch_json(&format!("/songs?id={id}"), json!({}))
                .await,
        )
        .await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("no fields to update"));

        let (status, body) = read_json(
            harness
                .patch_json("/songs?id=987654", json!({ "song": "Ghost" }))
                .await,
        )
        .await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("not found: song 987654"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn verses_are_paged_one_per_page_by_default() {
    with_songs_harness(|harness| async move {
        let id = harness.id_of("Alphabet").await;

        let (status, body) =
            read_json(harness.get(&format!("/songs/{id}/verses?verse_page=2")).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({
                "verses": ["b"],
                "verse_page": 2,
                "verse_size": 1,
                "total_verses": 3,
                "total_pages": 3
            })
        );

        let (status, _) =
            read_json(harness.get(&format!("/songs/{id}/verses?verse_page=4")).await).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);

        let (status, body) = read_json(harness.get("/songs/987654/verses").await).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("not found: song 987654"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn verse_search_returns_matching_lines() {
    with_songs_harness(|harness| async move {
        let (status, body) =
            read_json(harness.get("/songs/verses/search?text=LANDSLIDE").await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(
            body["data"],
            json!([{
                "song_id": harness.id_of("Bohemian Rhapsody").await,
                "group": "Queen",
                "song": "Bohemian Rhapsody",
                "verse": "Caught in a landslide"
            }])
        );

        let (_, body) = read_json(harness.get("/songs/verses/search?text=caught").await).await;
        let verses: Vec<&str> = body["data"]
            .as_array()
            .expect("data should be an array")
            .iter()
            .filter_map(|hit| hit["verse"].as_str())
            .collect();
        assert_eq!(
            verses,
            vec!["You caught me under false pretenses", "Caught in a landslide"]
        );
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn verse_search_without_matches_is_404() {
    with_songs_harness(|harness| async move {
        let (status, body) =
            read_json(harness.get("/songs/verses/search?text=xylophone").await).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "status": "Error", "message": "no verses matching \"xylophone\" found" })
        );
    })
    .await;
}
