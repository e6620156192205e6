use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use std::path::Path;
use tempfile::tempdir;

const SEARCH_PAGE: &str = r#"
    <html><body>
      <div class="appRow">
        <h5 class="appRowTitle">Bit 1.2.0</h5>
        <a class="downloadLink" href="/apk/bank/bit/bit-1-2-0-release/">Download</a>
      </div>
    </body></html>"#;

const RELEASE_PAGE: &str = r#"
    <div class="table-row headerFont"><div>Variant</div></div>
    <div class="table-row headerFont">
      <a class="accent_color" href="/apk/bank/bit/bit-1-2-0-release/bit-1-2-0-android-apk-download/">1.2.0</a>
    </div>"#;

const VARIANT_PAGE: &str = r#"
    <a class="downloadButton" href="/apk/bank/bit/bit-1-2-0-release/bit-1-2-0-android-apk-download/download/?key=k1">Download APK</a>"#;

const DOWNLOAD_PAGE: &str = r#"
    <a rel="nofollow" data-google-interstitial="false"
       href="/wp-content/themes/APKMirror/download.php?id=42&key=k2">click here</a>"#;

fn write_app(apps_dir: &Path, id: &str, json: &str) {
    let dir = apps_dir.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("app.json"), json).unwrap();
}

fn apkfetch(apps_dir: &Path, base_url: &str, gh_output: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("apkfetch"));
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("APKFETCH_APPS_DIR")
        .env("GITHUB_OUTPUT", gh_output)
        .arg("--apps-dir")
        .arg(apps_dir)
        .arg("--base-url")
        .arg(base_url)
        .arg("--request-delay-ms")
        .arg("0");
    cmd
}

#[test]
fn test_list_writes_apps_json() {
    let dir = tempdir().unwrap();
    let apps = dir.path().join("apps");
    write_app(&apps, "yahav", r#"{"version_file": "v.txt"}"#);
    write_app(&apps, "bit", r#"{"version_file": "v.txt"}"#);
    let listing = dir.path().join("apps.json");

    Command::new(cargo::cargo_bin!("apkfetch"))
        .arg("list")
        .arg("--apps-dir")
        .arg(&apps)
        .arg("--output")
        .arg(&listing)
        .assert()
        .success()
        .stdout(predicates::str::contains("bit"))
        .stdout(predicates::str::contains("yahav"));

    let ids: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&listing).unwrap()).unwrap();
    assert_eq!(ids, vec!["bit".to_string(), "yahav".to_string()]);
}

#[test]
fn test_end_to_end_apkmirror_update() {
    let mut server = Server::new();

    let _search = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded(
            "s".into(),
            "com.bnhp.payments.paymentsapp".into(),
        ))
        .with_status(200)
        .with_body(SEARCH_PAGE)
        .create();
    let _release = server
        .mock("GET", "/apk/bank/bit/bit-1-2-0-release/")
        .with_status(200)
        .with_body(RELEASE_PAGE)
        .create();
    let _variant = server
        .mock(
            "GET",
            "/apk/bank/bit/bit-1-2-0-release/bit-1-2-0-android-apk-download/",
        )
        .with_status(200)
        .with_body(VARIANT_PAGE)
        .create();
    let _download_page = server
        .mock(
            "GET",
            "/apk/bank/bit/bit-1-2-0-release/bit-1-2-0-android-apk-download/download/?key=k1",
        )
        .with_status(200)
        .with_body(DOWNLOAD_PAGE)
        .create();
    let body = vec![0x50u8; 50_000];
    let file = server
        .mock("GET", "/wp-content/themes/APKMirror/download.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("id".into(), "42".into()),
            Matcher::UrlEncoded("key".into(), "k2".into()),
        ]))
        .match_header(
            "Referer",
            format!(
                "{}/apk/bank/bit/bit-1-2-0-release/bit-1-2-0-android-apk-download/download/?key=k1",
                server.url()
            )
            .as_str(),
        )
        .with_status(200)
        .with_body(body.clone())
        .create();

    let dir = tempdir().unwrap();
    let apps = dir.path().join("apps");
    let version_file = dir.path().join("bit-version.txt");
    std::fs::write(&version_file, "1.0.0").unwrap();
    write_app(
        &apps,
        "bit",
        &format!(
            r#"{{"name": "Bit", "package_name": "com.bnhp.payments.paymentsapp", "version_file": {:?}}}"#,
            version_file
        ),
    );
    let output = dir.path().join("latest.apk");
    let gh_output = dir.path().join("gh_output");

    apkfetch(&apps, &server.url(), &gh_output)
        .arg("check")
        .arg("bit")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicates::str::contains("updated to 1.2.0"));

    file.assert();
    assert_eq!(std::fs::read(&output).unwrap(), body);
    assert_eq!(std::fs::read_to_string(&version_file).unwrap(), "1.2.0");
    assert_eq!(
        std::fs::read_to_string(&gh_output).unwrap(),
        "update_needed=true\nnew_version=1.2.0\n"
    );
}

#[test]
fn test_up_to_date_skips_download() {
    let mut server = Server::new();
    let _meta = server
        .mock("GET", "/api/7/app/getMeta")
        .match_query(Matcher::UrlEncoded(
            "package_name".into(),
            "com.spotify.music".into(),
        ))
        .with_status(200)
        .with_body(
            r#"{"info": {"status": "OK"}, "data": {"name": "Spotify",
                "file": {"vername": "8.9.0", "path": "https://pool.example/spotify.apk"}}}"#,
        )
        .create();

    let dir = tempdir().unwrap();
    let apps = dir.path().join("apps");
    let version_file = dir.path().join("spotify-version.txt");
    std::fs::write(&version_file, "v8.9.0\n").unwrap();
    write_app(
        &apps,
        "spotify",
        &format!(
            r#"{{"source": "Aptoide", "package_name": "com.spotify.music", "version_file": {:?}}}"#,
            version_file
        ),
    );
    let output = dir.path().join("latest.apk");
    let gh_output = dir.path().join("gh_output");

    apkfetch(&apps, &server.url(), &gh_output)
        .arg("check")
        .arg("spotify")
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicates::str::contains("up to date"));

    assert!(!output.exists());
    assert_eq!(
        std::fs::read_to_string(&version_file).unwrap(),
        "v8.9.0\n"
    );
    assert_eq!(
        std::fs::read_to_string(&gh_output).unwrap(),
        "update_needed=false\n"
    );
}

#[test]
fn test_missing_package_is_no_update() {
    let mut server = Server::new();
    let _meta = server
        .mock("GET", "/api/7/app/getMeta")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"info": {"status": "FAIL"}}"#)
        .create();

    let dir = tempdir().unwrap();
    let apps = dir.path().join("apps");
    write_app(
        &apps,
        "gone",
        r#"{"source": "aptoide", "package_name": "com.gone", "version_file": "unused.txt"}"#,
    );
    let gh_output = dir.path().join("gh_output");

    apkfetch(&apps, &server.url(), &gh_output)
        .arg("check")
        .arg("gone")
        .assert()
        .success()
        .stdout(predicates::str::contains("no release found"));

    assert_eq!(
        std::fs::read_to_string(&gh_output).unwrap(),
        "update_needed=false\n"
    );
}

#[test]
fn test_forbidden_download_fails_and_keeps_version() {
    let mut server = Server::new();
    let url = server.url();
    let _release = server
        .mock("GET", "/repos/owner/app/releases/latest")
        .with_status(200)
        .with_body(format!(
            r#"{{"tag_name": "2.0.0", "name": "App 2",
                "assets": [{{"name": "app.apk", "browser_download_url": "{}/dl/app.apk"}}]}}"#,
            url
        ))
        .create();
    let _file = server
        .mock("GET", "/dl/app.apk")
        .with_status(403)
        .create();

    let dir = tempdir().unwrap();
    let apps = dir.path().join("apps");
    let version_file = dir.path().join("app-version.txt");
    std::fs::write(&version_file, "1.0.0").unwrap();
    write_app(
        &apps,
        "app",
        &format!(
            r#"{{"source": "github", "repo": "owner/app", "version_file": {:?}}}"#,
            version_file
        ),
    );
    let output = dir.path().join("latest.apk");
    let status_file = dir.path().join("build_status.json");
    let gh_output = dir.path().join("gh_output");

    apkfetch(&apps, &url, &gh_output)
        .arg("check")
        .arg("app")
        .arg("-o")
        .arg(&output)
        .arg("--status-file")
        .arg(&status_file)
        .assert()
        .failure()
        .stderr(predicates::str::contains("HTTP 403"));

    assert!(!output.exists());
    assert_eq!(std::fs::read_to_string(&version_file).unwrap(), "1.0.0");
    let status: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&status_file).unwrap()).unwrap();
    assert_eq!(status["success"], false);
    assert_eq!(status["failed_version"], "");
    assert!(status["updated_at"].as_str().unwrap().contains(" UTC "));
    assert!(!gh_output.exists());
}

#[test]
fn test_github_without_repo_fails() {
    let dir = tempdir().unwrap();
    let apps = dir.path().join("apps");
    write_app(
        &apps,
        "app",
        r#"{"source": "github", "package_name": "com.example", "version_file": "v.txt"}"#,
    );
    let gh_output = dir.path().join("gh_output");

    apkfetch(&apps, "http://127.0.0.1:9", &gh_output)
        .arg("check")
        .arg("app")
        .assert()
        .failure()
        .stderr(predicates::str::contains(
            "'repo' field is required for source 'github'",
        ));
}

#[test]
fn test_check_unknown_app_fails() {
    let dir = tempdir().unwrap();
    let gh_output = dir.path().join("gh_output");

    apkfetch(&dir.path().join("apps"), "http://127.0.0.1:9", &gh_output)
        .arg("check")
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicates::str::contains("App config not found"));
}
