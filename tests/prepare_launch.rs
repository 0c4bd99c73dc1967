use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;
use sha1::{Digest, Sha1};
use tokio::sync::mpsc::UnboundedReceiver;

use tune_launcher::core::config::LauncherConfig;
use tune_launcher::core::platform::{OsFamily, Platform};
use tune_launcher::core::{
    EventSink, LaunchContext, LaunchEvent, LaunchStage, Launcher, LauncherError,
};

const ASSET_BODY: &[u8] = b"hello";

fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

fn natives_zip() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("liblwjgl.so", options).unwrap();
    writer.write_all(b"ELF").unwrap();
    writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
    writer.write_all(b"Manifest-Version: 1.0").unwrap();
    writer.finish().unwrap().into_inner()
}

fn fake_jre(root: &Path) -> PathBuf {
    let bin = root.join("jre/bin");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::create_dir_all(root.join("jre/lib/ext")).unwrap();
    std::fs::write(root.join("jre/lib/ext/nashorn.jar"), b"").unwrap();
    let java = bin.join("java");
    std::fs::write(&java, b"").unwrap();
    java
}

fn launcher_for(root: &Path, mirror: &str, events: EventSink) -> Launcher {
    let mut config = LauncherConfig::default();
    config.launcher.common_dir = root.join("common");
    config.launcher.game_dir = root.join("game");
    config.launcher.artifact_root_url = format!("{}/public/", mirror);
    config.java.jvm_args = vec!["-XX:+UseG1GC".to_string()];
    config.java.java_path = Some(fake_jre(root));

    let context = LaunchContext::with_parts(
        config,
        Platform::new(OsFamily::Linux, "x64"),
        reqwest::Client::new(),
        events,
    );
    Launcher::new(context).with_resources_url(format!("{}/resources", mirror))
}

fn drain(rx: &mut UnboundedReceiver<LaunchEvent>) -> Vec<LaunchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn prepares_a_distribution_against_a_mirror() {
    let mut server = mockito::Server::new_async().await;
    let client_jar = b"client-jar".to_vec();
    let tweaker_jar = b"tweaker-jar".to_vec();
    let natives = natives_zip();
    let asset_index = json!({
        "objects": { "icons/icon_16x16.png": { "hash": sha1_hex(ASSET_BODY), "size": 5 } }
    })
    .to_string();

    let distribution = json!({
        "version": { "mc_version": "1.8.9", "mc_version_major": "1.8", "jre_version": "8" },
        "client_name": "Tune Client",
        "version_attributes": "{LIBRARIES_ROOT_URL}versions/tune-1.8.9.json"
    });
    let primary = json!({
        "id": "tune-1.8.9",
        "inheritsFrom": "1.8.9",
        "mainClass": "net.minecraft.launchwrapper.Launch",
        "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --tweakClass tune.Tweaker",
        "libraries": [{
            "name": "org.tune:tweaker:1.0",
            "downloads": { "artifact": {
                "path": "org/tune/tweaker/1.0/tweaker-1.0.jar",
                "url": "{LIBRARIES_ROOT_URL}libraries/org/tune/tweaker/1.0/tweaker-1.0.jar",
                "sha1": sha1_hex(&tweaker_jar),
                "size": tweaker_jar.len()
            } }
        }]
    });
    let parent = json!({
        "id": "1.8.9",
        "mainClass": "net.minecraft.client.main.Main",
        "assets": "1.8",
        "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --gameDir ${game_directory} --assetIndex ${assets_index_name} --accessToken ${auth_access_token}",
        "assetIndex": {
            "id": "1.8",
            "url": "{LIBRARIES_ROOT_URL}indexes/1.8.json",
            "sha1": sha1_hex(asset_index.as_bytes()),
            "size": asset_index.len()
        },
        "downloads": { "client": {
            "url": "{LIBRARIES_ROOT_URL}versions/1.8.9.jar",
            "sha1": sha1_hex(&client_jar),
            "size": client_jar.len()
        } },
        "libraries": [{
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "natives": { "linux": "natives-linux", "osx": "natives-osx", "windows": "natives-windows" },
            "extract": { "exclude": ["META-INF/"] },
            "downloads": { "classifiers": { "natives-linux": {
                "path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar",
                "url": "{LIBRARIES_ROOT_URL}libraries/lwjgl-platform-2.9.4-natives-linux.jar",
                "sha1": sha1_hex(&natives),
                "size": natives.len()
            } } }
        }]
    });

    let documents = [
        ("/public/tune-1.8.9.json", distribution.to_string()),
        ("/public/versions/tune-1.8.9.json", primary.to_string()),
        ("/public/versions/1.8.9.json", parent.to_string()),
    ];
    for (path, body) in documents {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
    }

    // Every file is downloaded exactly once across two prepares.
    let downloads = [
        ("/public/indexes/1.8.json", asset_index.into_bytes()),
        (
            "/public/libraries/org/tune/tweaker/1.0/tweaker-1.0.jar",
            tweaker_jar,
        ),
        (
            "/public/libraries/lwjgl-platform-2.9.4-natives-linux.jar",
            natives,
        ),
        ("/public/versions/1.8.9.jar", client_jar),
        (
            "/resources/aa/aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d",
            ASSET_BODY.to_vec(),
        ),
    ];
    let mut download_mocks = Vec::new();
    for (path, body) in downloads {
        download_mocks.push(
            server
                .mock("GET", path)
                .with_status(200)
                .with_body(body)
                .expect(1)
                .create_async()
                .await,
        );
    }

    let temp = tempfile::tempdir().unwrap();
    let (events, mut rx) = EventSink::channel();
    let launcher = launcher_for(temp.path(), &server.url(), events);

    let prepared = launcher.prepare("tune-1.8.9").await.unwrap();
    assert_eq!(prepared.unverified, 0);
    assert_eq!(prepared.version.chain.ids().collect::<Vec<_>>(), vec!["1.8.9", "tune-1.8.9"]);

    let common = temp.path().join("common");
    let natives_dir = common.join("natives/tune-1.8.9");
    assert!(common.join("versions/1.8.9.jar").is_file());
    assert!(common.join("assets/objects/aa/aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d").is_file());
    assert!(natives_dir.join("liblwjgl.so").is_file());
    assert!(!natives_dir.join("META-INF").exists());

    let command = &prepared.command;
    assert_eq!(command.java, temp.path().join("jre/bin/java"));
    assert_eq!(command.working_dir, temp.path().join("game"));

    let classpath = [
        common.join("versions/1.8.9.jar"),
        common.join("libraries/org/tune/tweaker/1.0/tweaker-1.0.jar"),
        temp.path().join("jre/lib/ext/nashorn.jar"),
    ]
    .iter()
    .map(|p| p.to_string_lossy().to_string())
    .collect::<Vec<_>>()
    .join(":");

    let mut expected = vec![
        "-Xms2048M".to_string(),
        "-Xmx2048M".to_string(),
        "-XX:+UseG1GC".to_string(),
        format!("-Djava.library.path={}", natives_dir.display()),
        "-Dlauncher.name=Tune Client Launcher".to_string(),
        format!("-Dlauncher.version={}", env!("CARGO_PKG_VERSION")),
        "-cp".to_string(),
        classpath,
        "net.minecraft.launchwrapper.Launch".to_string(),
    ];
    expected.extend(
        [
            "--username",
            "${auth_player_name}",
            "--version",
            "tune_client",
            "--gameDir",
        ]
        .map(String::from),
    );
    expected.push(temp.path().join("game").to_string_lossy().to_string());
    expected.extend(
        [
            "--assetIndex",
            "1.8",
            "--accessToken",
            "FML:tune_client",
            "--tweakClass",
            "tune.Tweaker",
            "--width",
            "1280",
            "--height",
            "720",
        ]
        .map(String::from),
    );
    assert_eq!(command.args, expected);

    let stages: Vec<LaunchStage> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            LaunchEvent::StageStarted(stage) => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            LaunchStage::Resolving,
            LaunchStage::Java,
            LaunchStage::Assets,
            LaunchStage::Libraries,
            LaunchStage::Minecraft,
            LaunchStage::Launching,
        ]
    );

    // Everything verifies now; a second prepare downloads nothing.
    let again = launcher.prepare("tune-1.8.9").await.unwrap();
    assert_eq!(again.command.args, prepared.command.args);
    for mock in download_mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn cyclic_inheritance_fails_the_launch() {
    let mut server = mockito::Server::new_async().await;
    let documents = [
        (
            "/public/loop.json",
            json!({
                "version": { "mc_version": "1.8.9", "mc_version_major": "1.8" },
                "client_name": "Loop",
                "version_attributes": "{LIBRARIES_ROOT_URL}versions/loop.json"
            }),
        ),
        (
            "/public/versions/loop.json",
            json!({ "id": "loop", "inheritsFrom": "a" }),
        ),
        (
            "/public/versions/a.json",
            json!({ "id": "a", "inheritsFrom": "loop" }),
        ),
    ];
    for (path, body) in documents {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;
    }

    let temp = tempfile::tempdir().unwrap();
    let (events, mut rx) = EventSink::channel();
    let launcher = launcher_for(temp.path(), &server.url(), events);

    let err = launcher.prepare("loop").await.unwrap_err();
    assert!(matches!(err, LauncherError::CyclicInheritance { ref version, .. } if version == "loop"));

    let events = drain(&mut rx);
    assert!(matches!(events.last(), Some(LaunchEvent::Failed(_))));
    assert!(!events
        .iter()
        .any(|e| matches!(e, LaunchEvent::StageStarted(LaunchStage::Java))));
}

#[tokio::test]
async fn missing_distribution_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/public/ghost.json")
        .with_status(404)
        .create_async()
        .await;

    let temp = tempfile::tempdir().unwrap();
    let launcher = launcher_for(temp.path(), &server.url(), EventSink::disabled());

    let err = launcher.prepare("ghost").await.unwrap_err();
    assert!(matches!(err, LauncherError::ManifestFetch { .. }));
}
