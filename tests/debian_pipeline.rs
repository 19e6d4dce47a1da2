//! End-to-end tests of the Debian staging pipeline.
//!
//! These drive [`DebDriver::prepare`], which assembles the complete package
//! content without invoking `dpkg-deb`, and assert on the staged tree: the
//! payload location, generated scripts, control metadata and the ordering
//! guarantees of the lifecycle scripts.

use std::path::Path;

use packsmith::descriptor::{AppDescriptor, DesktopStarter, RunAfter, Service, UserScripts};
use packsmith::platform::debian::DebDriver;
use packsmith::staging::StagingTree;

/// A descriptor exercising every Debian feature at once: a payload, one
/// service, one desktop starter, a license, a deletion list, a run-after
/// hook and user script text.
fn full_descriptor(dir: &Path) -> AppDescriptor {
    let payload = dir.join("payload");
    std::fs::create_dir_all(payload.join("server")).unwrap();
    std::fs::write(payload.join("ontime.jar"), "main jar bytes").unwrap();
    std::fs::write(payload.join("server/worker.jar"), "worker jar bytes").unwrap();
    std::fs::write(payload.join("run.sh"), "#!/bin/sh\n").unwrap();

    let license = dir.join("license.txt");
    std::fs::write(&license, "Use at your own risk.\n\nNo warranty.\n").unwrap();

    AppDescriptor {
        identifier: "ontime".into(),
        display_name: "OnTime Scheduler".into(),
        version: "2.4.1".into(),
        description: "Task scheduling server\nRuns scheduled jobs.\n\nWith a web console.".into(),
        vendor: "Example Corp".into(),
        maintainer: "Build Bot <build@example.com>".into(),
        homepage: Some("https://example.com/ontime".into()),
        payload_dir: payload,
        license_file: Some(license),
        services: vec![Service {
            id: "ontime-srv".into(),
            description: "background scheduler".into(),
            main_jar: "server/worker.jar".into(),
            main_class: "com.example.Daemon".into(),
            start_arguments: "--quiet".into(),
        }],
        starters: vec![DesktopStarter {
            executable: "ontime".into(),
            display_name: "OnTime".into(),
            description: "Scheduler console".into(),
            main_jar: "ontime.jar".into(),
            main_class: "com.example.Console".into(),
            categories: vec!["Office".into()],
            ..Default::default()
        }],
        run_after: Some(RunAfter {
            executable: Some("run.sh".into()),
            ..Default::default()
        }),
        delete_files: vec!["server/cache.db".into()],
        scripts: UserScripts {
            preinst: Some("echo user-preinst".into()),
            postinst: Some("echo user-postinst".into()),
            prerm: Some("echo user-prerm".into()),
            postrm: Some("echo user-postrm".into()),
        },
        ..Default::default()
    }
}

async fn prepare(dir: &Path, app: &AppDescriptor) -> StagingTree {
    DebDriver::new(dir.join("dest"), dir.join("work"))
        .prepare(app)
        .await
        .unwrap()
}

fn read(tree: &StagingTree, rel: &str) -> String {
    std::fs::read_to_string(tree.path(rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
}

#[tokio::test]
async fn staging_places_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    // payload below the default installation root
    assert!(tree.path("usr/share/ontime/ontime.jar").is_file());
    assert!(tree.path("usr/share/ontime/server/worker.jar").is_file());

    // service init script, launcher, desktop entry
    assert!(tree.path("etc/init.d/ontime-srv").is_file());
    assert!(tree.path("usr/bin/ontime").is_file());
    assert!(tree.path("usr/share/applications/ontime.desktop").is_file());

    // control files and docs
    assert!(tree.path("DEBIAN/control").is_file());
    assert!(tree.path("DEBIAN/md5sums").is_file());
    assert!(tree.path("DEBIAN/conffiles").is_file());
    assert!(tree.path("DEBIAN/templates").is_file());
    assert!(tree.path("usr/share/doc/ontime/copyright").is_file());
    assert!(tree.path("usr/share/doc/ontime/changelog.gz").is_file());

    for name in ["preinst", "postinst", "prerm", "postrm"] {
        assert!(tree.path(format!("DEBIAN/{name}")).is_file(), "{name}");
    }
}

#[tokio::test]
async fn control_file_carries_descriptor_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    let control = read(&tree, "DEBIAN/control");
    assert!(control.contains("Package: ontime\n"));
    assert!(control.contains("Version: 2.4.1\n"));
    assert!(control.contains("Architecture: all\n"));
    assert!(control.contains("Maintainer: Build Bot <build@example.com>\n"));
    assert!(control.contains("Homepage: https://example.com/ontime\n"));
    assert!(control.contains("Description: Task scheduling server\n"));
    // long description: leading space per line, lone dot for blank lines
    assert!(control.contains(" Runs scheduled jobs.\n"));
    assert!(control.contains(" .\n"));
    assert!(control.contains(" With a web console.\n"));
}

#[tokio::test]
async fn init_script_is_registered_as_conffile() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    assert_eq!(read(&tree, "DEBIAN/conffiles"), "/etc/init.d/ontime-srv\n");

    let init = read(&tree, "etc/init.d/ontime-srv");
    assert!(init.contains("# Provides:          ontime-srv"));
    // jar path is single quoted so the init script survives spaces
    assert!(init.contains("[ -f '/usr/share/ontime/server/worker.jar' ] || exit 0"));
    assert!(init.contains("-cp '/usr/share/ontime/server/worker.jar' com.example.Daemon --quiet"));
}

#[tokio::test]
async fn md5sums_covers_payload_but_not_control_files() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    let md5sums = read(&tree, "DEBIAN/md5sums");
    assert!(md5sums.contains("usr/share/ontime/ontime.jar"));
    assert!(md5sums.contains("etc/init.d/ontime-srv"));
    assert!(!md5sums.contains("DEBIAN"));

    // two-space separator between digest and path
    for line in md5sums.lines() {
        let digest = line.split("  ").next().unwrap();
        assert_eq!(digest.len(), 32, "bad digest in {line:?}");
    }
}

#[tokio::test]
async fn postinst_orders_user_service_deletion_and_run_after() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    let postinst = read(&tree, "DEBIAN/postinst");
    assert!(postinst.starts_with("#!/bin/sh\nset -e\n"));
    assert!(postinst.trim_end().ends_with("exit 0"));

    let user = postinst.find("echo user-postinst").unwrap();
    let register = postinst
        .find("update-rc.d ontime-srv defaults 91 09 >/dev/null")
        .unwrap();
    let start = postinst
        .find("invoke-rc.d ontime-srv start >/dev/null")
        .unwrap();
    let delete = postinst
        .find("rm -f \"/usr/share/ontime/server/cache.db\"")
        .unwrap();
    let run_after = postinst.find("( cd \"/usr/share/ontime\" && run.sh & )").unwrap();

    assert!(user < register, "user text precedes service fragments");
    assert!(register < start, "service registers before it starts");
    assert!(start < delete, "deletion list runs after services");
    assert!(delete < run_after, "run-after hook is last");
}

#[tokio::test]
async fn license_gate_leads_preinst_and_cleans_up_in_postrm() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    let preinst = read(&tree, "DEBIAN/preinst");
    let gate = preinst.find(". /usr/share/debconf/confmodule").unwrap();
    let user = preinst.find("echo user-preinst").unwrap();
    assert!(gate < user, "license gate must run before user text");
    assert!(preinst.contains("db_get ontime/accept-license"));
    assert!(preinst.contains("exit 1"));

    let postrm = read(&tree, "DEBIAN/postrm");
    let user = postrm.find("echo user-postrm").unwrap();
    let unregister = postrm
        .find("update-rc.d ontime-srv remove >/dev/null")
        .unwrap();
    let purge = postrm.find("db_purge").unwrap();
    let delete = postrm
        .find("rm -f \"/usr/share/ontime/server/cache.db\"")
        .unwrap();
    assert!(user < unregister);
    assert!(unregister < purge);
    assert!(purge < delete);

    let templates = read(&tree, "DEBIAN/templates");
    assert!(templates.contains("Template: ontime/license"));
    assert!(templates.contains("Template: ontime/accept-license"));
    assert!(templates.contains("Template: ontime/error-license"));
    assert!(templates.contains(" Use at your own risk.\n"));
    assert!(templates.contains(" .\n"));
}

#[tokio::test]
async fn no_license_means_no_gate_and_no_templates() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = full_descriptor(dir.path());
    app.license_file = None;
    let tree = prepare(dir.path(), &app).await;

    assert!(!tree.path("DEBIAN/templates").exists());
    let preinst = read(&tree, "DEBIAN/preinst");
    assert!(!preinst.contains("db_get"));
    assert!(preinst.contains("echo user-preinst"));
}

#[tokio::test]
async fn lifecycle_scripts_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());

    let first = DebDriver::new(dir.path().join("dest"), dir.path().join("work-a"))
        .prepare(&app)
        .await
        .unwrap();
    let second = DebDriver::new(dir.path().join("dest"), dir.path().join("work-b"))
        .prepare(&app)
        .await
        .unwrap();

    for name in [
        "DEBIAN/preinst",
        "DEBIAN/postinst",
        "DEBIAN/prerm",
        "DEBIAN/postrm",
        "DEBIAN/control",
        "DEBIAN/conffiles",
        "DEBIAN/templates",
    ] {
        assert_eq!(
            std::fs::read(first.path(name)).unwrap(),
            std::fs::read(second.path(name)).unwrap(),
            "{name} differs between identical builds"
        );
    }
}

#[tokio::test]
async fn desktop_entry_and_launcher_reference_the_starter() {
    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    let launcher = read(&tree, "usr/bin/ontime");
    assert!(launcher.starts_with("#!/bin/bash\n"));
    assert!(launcher
        .contains("java -cp \"/usr/share/ontime/ontime.jar\" com.example.Console \"$@\""));

    let entry = read(&tree, "usr/share/applications/ontime.desktop");
    assert!(entry.starts_with("[Desktop Entry]\n"));
    assert!(entry.contains("Name=OnTime\n"));
    assert!(entry.contains("Exec=/usr/bin/ontime %F\n"));
    assert!(entry.contains("Categories=Office;\n"));
}

#[cfg(unix)]
#[tokio::test]
async fn staged_tree_has_normalized_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let app = full_descriptor(dir.path());
    let tree = prepare(dir.path(), &app).await;

    let mode = |rel: &str| {
        std::fs::metadata(tree.path(rel)).unwrap().permissions().mode() & 0o777
    };

    assert_eq!(mode("usr/share/ontime/ontime.jar"), 0o644);
    assert_eq!(mode("usr/share/ontime/run.sh"), 0o755);
    assert_eq!(mode("etc/init.d/ontime-srv"), 0o755);
    assert_eq!(mode("usr/bin/ontime"), 0o755);
    assert_eq!(mode("DEBIAN/postinst"), 0o755);
    assert_eq!(mode("usr/share/ontime"), 0o755);
}
