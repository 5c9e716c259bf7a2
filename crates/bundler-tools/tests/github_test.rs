use bundler_core::ResolvedRepositoryId;
use bundler_tools::error::SourceError;
use bundler_tools::github::{
    GithubRepository, MAX_PAGE_SIZE, ReleaseAsset, SourceProvider, Visibility, list_repositories,
};
use bytes::Bytes;
use mockall::mock;
use mockall::predicate::eq;

mock! {
    Source {}

    impl SourceProvider for Source {
        async fn download_repository(&self, id: &ResolvedRepositoryId) -> Result<Bytes, SourceError>;
        async fn list_assets(&self, id: &ResolvedRepositoryId) -> Result<Vec<ReleaseAsset>, SourceError>;
        async fn list_repositories_page(&self, visibility: Visibility, page: u32) -> Result<Vec<GithubRepository>, SourceError>;
        async fn ping(&self) -> Result<(), SourceError>;
    }
}

fn repo(name: &str, topics: &[&str], archived: bool) -> GithubRepository {
    GithubRepository {
        name: name.to_owned(),
        language: Some("TypeScript".to_owned()),
        topics: topics.iter().map(|t| (*t).to_owned()).collect(),
        archived,
    }
}

fn full_page(prefix: &str) -> Vec<GithubRepository> {
    (0..MAX_PAGE_SIZE)
        .map(|i| repo(&format!("{prefix}-{i}"), &[], false))
        .collect()
}

fn names(repositories: &[GithubRepository]) -> Vec<&str> {
    repositories.iter().map(|r| r.name.as_str()).collect()
}

#[tokio::test]
async fn pages_until_a_short_page() {
    let mut source = MockSource::new();
    source
        .expect_list_repositories_page()
        .with(eq(Visibility::Public), eq(1))
        .times(1)
        .returning(|_, _| Ok(full_page("first")));
    source
        .expect_list_repositories_page()
        .with(eq(Visibility::Public), eq(2))
        .times(1)
        .returning(|_, _| Ok(vec![repo("last", &[], false)]));

    let listed = list_repositories(&source, Visibility::Public, &[])
        .await
        .unwrap();

    assert_eq!(listed.len(), MAX_PAGE_SIZE + 1);
    assert_eq!(listed[0].name, "first-0");
    assert_eq!(listed[MAX_PAGE_SIZE].name, "last");
}

#[tokio::test]
async fn archived_repositories_are_dropped() {
    let mut source = MockSource::new();
    source
        .expect_list_repositories_page()
        .times(1)
        .returning(|_, _| {
            Ok(vec![
                repo("live", &[], false),
                repo("retired", &[], true),
            ])
        });

    let listed = list_repositories(&source, Visibility::All, &[])
        .await
        .unwrap();

    assert_eq!(names(&listed), ["live"]);
}

#[tokio::test]
async fn topics_keep_repositories_with_any_match() {
    let mut source = MockSource::new();
    source
        .expect_list_repositories_page()
        .times(1)
        .returning(|_, _| {
            Ok(vec![
                repo("server", &["backend", "nodejs"], false),
                repo("client", &["frontend"], false),
                repo("untagged", &[], false),
                repo("old-server", &["backend"], true),
            ])
        });

    let topics = vec!["backend".to_owned(), "infra".to_owned()];
    let listed = list_repositories(&source, Visibility::All, &topics)
        .await
        .unwrap();

    assert_eq!(names(&listed), ["server"]);
}

#[tokio::test]
async fn page_error_is_returned() {
    let mut source = MockSource::new();
    source
        .expect_list_repositories_page()
        .with(eq(Visibility::Private), eq(1))
        .returning(|_, _| Ok(full_page("first")));
    source
        .expect_list_repositories_page()
        .with(eq(Visibility::Private), eq(2))
        .returning(|_, _| {
            Err(SourceError::Status {
                url: "https://api.github.test/orgs/MapColonies/repos".to_owned(),
                status: 401,
            })
        });

    let err = list_repositories(&source, Visibility::Private, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Status { status: 401, .. }));
}

#[test]
fn visibility_parses_and_gates_token() {
    assert_eq!("private".parse::<Visibility>(), Ok(Visibility::Private));
    assert_eq!(Visibility::default(), Visibility::All);
    assert!("internal".parse::<Visibility>().is_err());

    assert!(Visibility::All.requires_token());
    assert!(Visibility::Private.requires_token());
    assert!(!Visibility::Public.requires_token());
}
