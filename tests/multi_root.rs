mod common;

use std::collections::BTreeMap;
use std::fs;

use pipeline_fixture::config::descriptors::{BackLink, RootsConfig};
use pipeline_fixture::path_cache::PathCache;
use pipeline_fixture::{PipelineConfiguration, ProjectFixture};

use common::start_run;

#[test]
fn roots_descriptor_lists_every_root_with_parent_paths() -> anyhow::Result<()> {
    let (_td, run) = start_run()?;
    let mut fixture = ProjectFixture::set_up(&run, "project_code")?;
    fixture.setup_multi_root_fixtures()?;

    let alt_1 = fixture.alt_root_1().expect("alt root 1").to_path_buf();
    let alt_2 = fixture.alt_root_2().expect("alt root 2").to_path_buf();
    assert_eq!(alt_1, run.tank_temp().join("alternate_1/project_code"));
    assert_eq!(alt_2, run.tank_temp().join("alternate_2/project_code"));

    let roots_file = fixture.project_config().join("core/roots.yml");
    let roots: RootsConfig = serde_saphyr::from_str(&fs::read_to_string(roots_file)?)?;
    let keys: Vec<&str> = roots.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["alternate_1", "alternate_2", "primary"]);

    let expected = [
        ("primary", fixture.project_root().parent().unwrap().to_path_buf()),
        ("alternate_1", alt_1.parent().unwrap().to_path_buf()),
        ("alternate_2", alt_2.parent().unwrap().to_path_buf()),
    ];
    for (name, parent) in expected {
        let paths = &roots[name];
        assert_eq!(paths.windows_path, parent, "{} windows", name);
        assert_eq!(paths.linux_path, parent, "{} linux", name);
        assert_eq!(paths.mac_path, parent, "{} mac", name);
    }
    Ok(())
}

#[test]
fn alternate_roots_link_back_and_are_registered() -> anyhow::Result<()> {
    let (_td, run) = start_run()?;
    let mut fixture = ProjectFixture::set_up(&run, "project_code")?;
    fixture.setup_multi_root_fixtures()?;

    let project_tank = fixture.project_root().join("tank");
    let alt_1 = fixture.alt_root_1().unwrap().to_path_buf();
    let alt_2 = fixture.alt_root_2().unwrap().to_path_buf();

    for alt in [&alt_1, &alt_2] {
        let text = fs::read_to_string(alt.join("tank/config/tank_configs.yml"))?;
        let links: Vec<BackLink> = serde_saphyr::from_str(&text)?;
        assert_eq!(links, vec![BackLink::uniform(&project_tank)]);

        let pc = PipelineConfiguration::from_path(alt)?;
        assert_eq!(pc.root(), project_tank.as_path());
    }

    let pc = fixture.pipeline_configuration();
    assert_eq!(pc.root_names(), vec!["alternate_1", "alternate_2", "primary"]);
    let cache = PathCache::open(pc)?;
    let mut mapped = cache.mappings_for_entity("Project", 1)?;
    mapped.sort();
    let mut expected = vec![fixture.project_root().to_path_buf(), alt_1.clone(), alt_2.clone()];
    expected.sort();
    assert_eq!(mapped, expected);
    let roots: Vec<String> = cache.rows()?.into_iter().map(|r| r.root).collect();
    assert_eq!(roots, vec!["primary", "alternate_1", "alternate_2"]);
    cache.close()?;
    Ok(())
}

#[test]
fn templates_resolve_under_their_roots() -> anyhow::Result<()> {
    let (_td, run) = start_run()?;
    let mut fixture = ProjectFixture::set_up(&run, "project_code")?;
    fixture.setup_multi_root_fixtures()?;

    let templates = fixture.tk().templates();
    assert_eq!(templates.len(), 3);

    let fields = BTreeMap::from([("Shot".to_string(), "sh_010".to_string())]);
    let pc = fixture.pipeline_configuration();
    let alt = templates["shot_area_alt_1"].apply_fields(pc, &fields)?;
    assert_eq!(alt, Some(fixture.alt_root_1().unwrap().join("shots").join("sh_010")));
    let primary = templates["shot_area"].apply_fields(pc, &fields)?;
    assert_eq!(primary, Some(fixture.project_root().join("shots").join("sh_010")));
    assert_eq!(templates["shot_area"].apply_fields(pc, &BTreeMap::new())?, None);
    Ok(())
}

#[test]
fn tear_down_rotates_every_root() -> anyhow::Result<()> {
    let (_td, run) = start_run()?;
    let mut fixture = ProjectFixture::set_up(&run, "project_code")?;
    fixture.setup_multi_root_fixtures()?;
    let alt_1 = fixture.alt_root_1().unwrap().to_path_buf();
    let alt_2 = fixture.alt_root_2().unwrap().to_path_buf();

    fixture.tear_down()?;

    for root in [fixture.project_root().to_path_buf(), alt_1, alt_2] {
        assert!(!root.exists(), "{} still present", root.display());
        let mut backup = root.clone().into_os_string();
        backup.push(".old");
        assert!(std::path::PathBuf::from(backup).is_dir());
    }
    Ok(())
}
