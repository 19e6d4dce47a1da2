//! Feature contributors for the Debian build.
//!
//! Each optional descriptor feature (user script text, services, desktop
//! starters, license agreement, deletion list, run-after hook) is handled
//! by one contributor that materializes supporting files into the staging
//! tree and registers its lifecycle fragments with the composer. Absent
//! features contribute nothing.
//!
//! The driver invokes the contributors in a fixed order; combined with the
//! composer's FIFO groups this makes the generated scripts reproducible.

use crate::descriptor::{AppDescriptor, DesktopStarter, Service};
use crate::error::{ErrorExt, Result};
use crate::icons;
use crate::platform::debian::control::ControlBuilder;
use crate::script::{Phase, ScriptComposer};
use crate::staging::StagingTree;
use crate::template::Template;

/// Icon sizes the hicolor theme expects for application icons.
const ICON_SIZES: [u32; 5] = [16, 32, 48, 64, 128];

/// Seconds the init script waits for a service to die before killing it.
const SERVICE_STOP_WAIT: &str = "2";

/// Appends the descriptor's literal per-phase script text.
///
/// Runs first, so user text precedes every generated tail fragment.
pub fn contribute_user_scripts(app: &AppDescriptor, composer: &mut ScriptComposer) {
    let hooks = [
        (Phase::PreInstall, &app.scripts.preinst),
        (Phase::PostInstall, &app.scripts.postinst),
        (Phase::PreRemove, &app.scripts.prerm),
        (Phase::PostRemove, &app.scripts.postrm),
    ];
    for (phase, text) in hooks {
        if let Some(text) = text {
            composer.add_tail(phase, text.clone());
        }
    }
}

/// Materializes one init script per service and wires the service into the
/// lifecycle: registered and started after install, stopped before removal,
/// unregistered on purge.
pub async fn contribute_services(
    app: &AppDescriptor,
    tree: &StagingTree,
    composer: &mut ScriptComposer,
    control: &mut ControlBuilder,
) -> Result<()> {
    for service in &app.services {
        setup_service(app, tree, composer, control, service).await?;
    }
    Ok(())
}

async fn setup_service(
    app: &AppDescriptor,
    tree: &StagingTree,
    composer: &mut ScriptComposer,
    control: &mut ControlBuilder,
    service: &Service,
) -> Result<()> {
    let id = &service.id;
    let root = app.install_root();
    let root = root.display();

    // services share the run-after working directory when one is configured
    let work_dir = app.run_after.as_ref().and_then(|r| r.work_dir.as_deref());
    let (workdir, main_jar) = match work_dir {
        Some(wd) => (
            format!("{root}/{wd}"),
            format!("'{root}/{wd}/{}'", service.main_jar),
        ),
        None => (format!("{root}"), format!("'{root}/{}'", service.main_jar)),
    };
    let mut start_arguments = format!("-cp {main_jar} {}", service.main_class);
    if !service.start_arguments.is_empty() {
        start_arguments.push(' ');
        start_arguments.push_str(&service.start_arguments);
    }

    let mut init_script = Template::load("deb/init-service.sh")?;
    init_script.set_placeholder("name", Some(id));
    init_script.set_placeholder("displayName", Some(&app.display_name));
    init_script.set_placeholder("description", Some(&service.description));
    init_script.set_placeholder("wait", Some(SERVICE_STOP_WAIT));
    init_script.set_placeholder("workdir", Some(&workdir));
    init_script.set_placeholder("mainJar", Some(&main_jar));
    init_script.set_placeholder("startArguments", Some(&start_arguments));

    let init_script_file = format!("etc/init.d/{id}");
    init_script
        .write_to(&tree.path(&init_script_file), true)
        .await?;
    control.add_conffile(format!("/{init_script_file}"));

    composer.add_tail(
        Phase::PostInstall,
        format!(
            "if [ -f \"/etc/init.d/{id}\" ]; then\n  update-rc.d {id} defaults 91 09 >/dev/null\nfi"
        ),
    );
    composer.add_tail(
        Phase::PostInstall,
        format!("if [ -f \"/etc/init.d/{id}\" ]; then\n  invoke-rc.d {id} start >/dev/null\nfi"),
    );
    composer.add_tail(
        Phase::PreRemove,
        format!("if [ -f \"/etc/init.d/{id}\" ]; then\n  invoke-rc.d {id} stop >/dev/null\nfi"),
    );
    composer.add_tail(
        Phase::PostRemove,
        format!("if [ \"$1\" = \"purge\" ] ; then\n    update-rc.d {id} remove >/dev/null\nfi"),
    );
    Ok(())
}

/// Writes launcher script, rasterized icon set and desktop entry for every
/// desktop starter. Starters contribute no lifecycle fragments.
pub async fn contribute_starters(app: &AppDescriptor, tree: &StagingTree) -> Result<()> {
    if app.starters.is_empty() {
        return Ok(());
    }
    let icon_sources = icons::load_icons(&app.icons);
    for starter in &app.starters {
        setup_starter(app, tree, starter, &icon_sources).await?;
    }
    Ok(())
}

async fn setup_starter(
    app: &AppDescriptor,
    tree: &StagingTree,
    starter: &DesktopStarter,
    icon_sources: &[icons::IconInfo],
) -> Result<()> {
    let unix_name = &starter.executable;
    let root = app.install_root();

    let mut launcher = format!(
        "#!/bin/bash\njava -cp \"{}/{}\" {}",
        root.display(),
        starter.main_jar,
        starter.main_class
    );
    if !starter.start_arguments.is_empty() {
        launcher.push(' ');
        launcher.push_str(&starter.start_arguments);
    }
    launcher.push_str(" \"$@\"\n");
    tree.write(format!("usr/bin/{unix_name}"), launcher, true)
        .await?;

    for size in ICON_SIZES {
        let dest = tree.path(format!(
            "usr/share/icons/hicolor/{size}x{size}/apps/{unix_name}.png"
        ));
        if icons::rasterize(icon_sources, size, &dest).await?.is_none() {
            log::warn!("no usable icon source for {unix_name} at {size}x{size}");
        }
    }

    let mut entry = String::from("[Desktop Entry]\n");
    entry.push_str(&format!("Name={}\n", starter.display_name));
    entry.push_str(&format!(
        "Comment={}\n",
        starter.description.replace('\n', " ")
    ));
    entry.push_str(&format!("Exec=/usr/bin/{unix_name} %F\n"));
    entry.push_str(&format!("Icon={unix_name}\n"));
    entry.push_str("Terminal=false\n");
    entry.push_str("StartupNotify=true\n");
    entry.push_str("Type=Application\n");
    if !starter.mime_types.is_empty() {
        entry.push_str(&format!("MimeType={};\n", starter.mime_types.join(";")));
    }
    if !starter.categories.is_empty() {
        entry.push_str(&format!("Categories={};\n", starter.categories.join(";")));
    }
    tree.write(
        format!("usr/share/applications/{unix_name}.desktop"),
        entry,
        false,
    )
    .await?;
    Ok(())
}

/// Gates installation on license acceptance through debconf.
///
/// Writes the three debconf prompts into `DEBIAN/templates` and registers
/// the blocking acceptance check as a pre-install head fragment, ahead of
/// every other fragment of that phase. Rejection aborts the installation
/// with exit status 1 and drops the stored answers.
pub async fn contribute_eula(
    app: &AppDescriptor,
    tree: &StagingTree,
    composer: &mut ScriptComposer,
) -> Result<()> {
    let Some(license_file) = &app.license_file else {
        return Ok(());
    };
    let license_name = format!("{}/license", app.identifier);
    let accept_name = format!("{}/accept-license", app.identifier);
    let error_name = format!("{}/error-license", app.identifier);

    let license_text = tokio::fs::read_to_string(license_file)
        .await
        .fs_context("reading license file", license_file)?;

    let mut templates = String::new();
    templates.push_str(&format!("Template: {license_name}\n"));
    templates.push_str("Type: note\n");
    templates.push_str("Description: License agreement\n");
    for line in license_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            templates.push_str(" .\n");
        } else {
            templates.push_str(&format!(" {line}\n"));
        }
    }
    templates.push('\n');
    templates.push_str(&format!("Template: {accept_name}\n"));
    templates.push_str("Type: boolean\n");
    templates.push_str("Description: Do you accept the license agreement?\n");
    templates.push_str("Description-de.UTF-8: Akzeptieren Sie die Lizenzvereinbarung?\n");
    templates.push('\n');
    templates.push_str(&format!("Template: {error_name}\n"));
    templates.push_str("Type: error\n");
    templates
        .push_str("Description: It is required to accept the license to install this package.\n");
    templates.push_str(
        "Description-de.UTF-8: Zur Installation dieser Anwendung m\u{fc}ssen Sie die Lizenz akzeptieren.\n",
    );
    templates.push('\n');
    tree.write("DEBIAN/templates", templates, false).await?;

    composer.add_head(
        Phase::PreInstall,
        format!(
            ". /usr/share/debconf/confmodule\n\
             if [ \"$1\" = \"install\" ] ; then\n\
             \x20 db_get {accept_name} || true\n\
             \x20 if [ \"$RET\" = \"true\" ]; then\n\
             \x20   echo \"License already accepted\"\n\
             \x20 else\n\
             \x20   db_input high {license_name} || true\n\
             \x20   db_go\n\
             \x20   db_input high {accept_name} || true\n\
             \x20   db_go\n\
             \x20   db_get {accept_name} || true\n\
             \x20   if [ \"$RET\" != \"true\" ]; then\n\
             \x20       echo \"License was not accepted by the user\"\n\
             \x20       db_input high {error_name} || true\n\
             \x20       db_go\n\
             \x20       db_purge\n\
             \x20       exit 1\n\
             \x20   fi\n\
             \x20 fi\n\
             fi"
        ),
    );
    composer.add_tail(
        Phase::PostRemove,
        "if [ \"$1\" = \"remove\" ] || [ \"$1\" = \"purge\" ]  ; then\n\
         \x20 if [ -e /usr/share/debconf/confmodule ]; then\n\
         \x20   . /usr/share/debconf/confmodule\n\
         \x20   db_purge\n\
         \x20 fi\n\
         fi",
    );
    Ok(())
}

/// Deletes the listed files below the installation root after install and
/// again after removal, so stale generated files never survive.
pub fn contribute_delete_files(app: &AppDescriptor, composer: &mut ScriptComposer) {
    let root = app.install_root();
    for file in &app.delete_files {
        let fragment = format!("rm -f \"{}/{file}\"", root.display());
        composer.add_tail(Phase::PostInstall, fragment.clone());
        composer.add_tail(Phase::PostRemove, fragment);
    }
}

/// Starts the configured command in the background once installation
/// completes. The subshell keeps the package manager from blocking on it.
pub fn contribute_run_after(app: &AppDescriptor, composer: &mut ScriptComposer) {
    let Some(run_after) = &app.run_after else {
        return;
    };
    let root = app.install_root();
    let dir = match &run_after.work_dir {
        Some(wd) => format!("{}/{wd}", root.display()),
        None => root.display().to_string(),
    };
    let command = if let Some(executable) = &run_after.executable {
        executable.clone()
    } else if let (Some(jar), Some(class)) = (&run_after.main_jar, &run_after.main_class) {
        format!("java -cp \"{jar}\" {class}")
    } else {
        return;
    };
    composer.add_tail(Phase::PostInstall, format!("( cd \"{dir}\" && {command} & )"));
}
