use mockito::{Matcher, Server, ServerGuard};
use std::time::Duration;
use taskfeed::client::{FetchError, POSTS_PER_PAGE, PostClient, PostSource};
use taskfeed::feed::{Feed, Footer, Phase, drive};

fn page_json(page: u32, len: usize) -> String {
    let posts: Vec<serde_json::Value> = (0..len)
        .map(|i| {
            let id = (page as usize - 1) * 10 + i + 1;
            serde_json::json!({
                "userId": 1,
                "id": id,
                "title": format!("title {id}"),
                "body": format!("body of post {id}"),
            })
        })
        .collect();
    serde_json::Value::Array(posts).to_string()
}

async fn mock_page(server: &mut ServerGuard, page: u32, len: usize) -> mockito::Mock {
    server
        .mock("GET", "/posts")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("_page".into(), page.to_string()),
            Matcher::UrlEncoded("_limit".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(page, len))
        .expect(1)
        .create_async()
        .await
}

fn client_for(server: &ServerGuard) -> PostClient {
    PostClient::new(&format!("{}/posts", server.url()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_page_decodes_posts() {
    let mut server = Server::new_async().await;
    let mock = mock_page(&mut server, 2, 10).await;

    let client = client_for(&server);
    let posts = client.fetch_page(2, POSTS_PER_PAGE).await.unwrap();

    mock.assert_async().await;
    assert_eq!(posts.len(), 10);
    assert_eq!(posts[0].id, 11);
    assert_eq!(posts[0].title, "title 11");
    assert_eq!(posts[0].body, "body of post 11");
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/posts")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.fetch_page(1, POSTS_PER_PAGE).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_malformed_payload_is_an_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/posts")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"posts": "not an array"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.fetch_page(1, POSTS_PER_PAGE).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_an_error() {
    // Port 9 (discard) on localhost is closed in test environments
    let client = PostClient::new("http://127.0.0.1:9/posts", Duration::from_secs(5)).unwrap();
    let err = client.fetch_page(1, POSTS_PER_PAGE).await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::Transport(_) | FetchError::Timeout(_)
    ));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/posts")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(3));
            w.write_all(b"[]")
        })
        .create_async()
        .await;

    let client =
        PostClient::new(&format!("{}/posts", server.url()), Duration::from_secs(1)).unwrap();
    let err = client.fetch_page(1, POSTS_PER_PAGE).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_secs(1)));
    assert_eq!(err.to_string(), "request timed out after 1s");
}

#[tokio::test]
async fn test_feed_pages_through_server_until_short_page() {
    let mut server = Server::new_async().await;
    let mut mocks = Vec::new();
    for page in 1..=3 {
        mocks.push(mock_page(&mut server, page, 10).await);
    }
    mocks.push(mock_page(&mut server, 4, 4).await);

    let client = client_for(&server);
    let mut feed = Feed::new();

    let first = feed.activate().unwrap();
    assert!(drive(&mut feed, &client, first).await);
    while let Some(next) = feed.on_sentinel_visible() {
        assert!(drive(&mut feed, &client, next).await);
    }

    for mock in &mocks {
        mock.assert_async().await;
    }
    assert_eq!(feed.posts().len(), 34);
    assert!(!feed.has_more());
    assert_eq!(feed.footer(), Footer::End);

    feed.set_search_query("TITLE 3");
    let ids: Vec<u64> = feed.filtered_posts().map(|p| p.id).collect();
    assert_eq!(ids, [3, 30, 31, 32, 33, 34]);
}

#[tokio::test]
async fn test_feed_error_then_retry() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/posts")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut feed = Feed::new();
    let request = feed.activate().unwrap();
    drive(&mut feed, &client, request).await;

    failing.assert_async().await;
    assert!(matches!(feed.phase(), Phase::Errored { .. }));
    assert!(feed.error().unwrap().contains("500"));
    failing.remove_async().await;

    let ok = mock_page(&mut server, 1, 10).await;
    let again = feed.retry().unwrap();
    drive(&mut feed, &client, again).await;

    ok.assert_async().await;
    assert_eq!(*feed.phase(), Phase::Idle);
    assert_eq!(feed.posts().len(), 10);
    assert_eq!(feed.page(), 2);
}
