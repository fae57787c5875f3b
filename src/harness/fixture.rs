use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::descriptors::{
    render_roots, BackLink, InstallLocation, PipelineConfigDescriptor, RootPaths, RootsConfig,
    BACK_LINK_FILE, INSTALL_LOCATION_FILE, PIPELINE_CONFIG_FILE, PRIMARY_ROOT, ROOTS_FILE,
};
use crate::config::pipeline::PipelineConfiguration;
use crate::fs_op::copy::copy_folder;
use crate::fs_op::create::create_file_within;
use crate::harness::{io_err, FixtureError, FixtureState, TestRun};
use crate::path_cache::{PathCache, PathCacheRow};
use crate::record_store::{Entity, MockRecordStore, RecordStore};
use crate::toolkit::Toolkit;

/// Core configuration that sets up several storage roots.
pub const MULTI_ROOT_CORE: &str = "multi_root_core";
pub const DEFAULT_CORE: &str = "default_core";

const PROJECT_TYPE: &str = "Project";
const PROJECT_ID: i64 = 1;
const PIPELINE_CONFIG_ID: i64 = 123;
const PIPELINE_CONFIG_NAME: &str = "Primary";

/// Config folders copied next to `core` by [`ProjectFixture::setup_fixtures`].
const CONFIG_DIRS: &[&str] = &["env", "hooks", "test_app", "test_engine"];
const TEST_ENV_FILE: &str = "test.yml";
const APP_LOCATION_TOKEN: &str = "TEST_APP_LOCATION";
const ENGINE_LOCATION_TOKEN: &str = "TEST_ENGINE_LOCATION";

/// A synthetic project inside a [`TestRun`]: directory tree, descriptor
/// files, loaded configuration, mock record store and path cache entries.
pub struct ProjectFixture<'run> {
    run: &'run TestRun,
    state: FixtureState,
    project: Entity,
    project_root: PathBuf,
    project_config: PathBuf,
    alt_root_1: Option<PathBuf>,
    alt_root_2: Option<PathBuf>,
    tk: Toolkit<MockRecordStore>,
}

impl<'run> ProjectFixture<'run> {
    /// Build the project tree for `project_tank_name` (a `/` separated
    /// relative path under the run's data area) and register the project.
    pub fn set_up(run: &'run TestRun, project_tank_name: &str) -> Result<Self, FixtureError> {
        let mut state = FixtureState::Uninitialized;

        let project = Entity::new(PROJECT_TYPE, PROJECT_ID)
            .with_name("project_name")
            .with_field("tank_name", project_tank_name);
        let project_root = project_tank_name
            .split('/')
            .fold(run.tank_temp().to_path_buf(), |acc, part| acc.join(part));

        run.rotate(&project_root)?;

        let project_tank = project_root.join("tank");
        let cache_dir = project_tank.join("cache");
        fs::create_dir_all(&cache_dir).map_err(io_err("creating", &cache_dir))?;

        let area = run.tank_temp();
        create_file_within(
            area,
            project_tank.join(BACK_LINK_FILE),
            &BackLink::uniform(&project_tank).render(),
        )?;
        let descriptor = PipelineConfigDescriptor {
            project_name: project_tank_name.to_string(),
            pc_id: PIPELINE_CONFIG_ID,
            project_id: PROJECT_ID,
            pc_name: PIPELINE_CONFIG_NAME.to_string(),
        };
        create_file_within(area, project_tank.join(PIPELINE_CONFIG_FILE), &descriptor.render())?;
        create_file_within(
            area,
            project_tank.join(INSTALL_LOCATION_FILE),
            &InstallLocation::uniform(&project_tank).render(),
        )?;
        let mut roots = RootsConfig::new();
        roots.insert(PRIMARY_ROOT.to_string(), RootPaths::uniform(area));
        create_file_within(area, project_tank.join(ROOTS_FILE), &render_roots(&roots)?)?;
        state = state.advance(FixtureState::TreeBuilt)?;

        let pc = PipelineConfiguration::from_path(&project_tank)?;
        let cfg = run.config();
        let store = MockRecordStore::connect(&cfg.mock_server_url, &cfg.mock_script_name, &cfg.mock_api_key);
        state = state.advance(FixtureState::ConfigLoaded)?;

        let mut fixture = Self {
            run,
            state,
            project: project.clone(),
            project_root: project_root.clone(),
            project_config: project_tank.join("config"),
            alt_root_1: None,
            alt_root_2: None,
            tk: Toolkit::new(pc, store),
        };
        fixture.add_production_path(&project_root, Some(&project))?;
        fixture.state = fixture.state.advance(FixtureState::EntitiesSeeded)?;
        tracing::debug!("project fixture ready at {}", fixture.project_root.display());
        Ok(fixture)
    }

    pub fn state(&self) -> FixtureState {
        self.state
    }

    pub fn run(&self) -> &TestRun {
        self.run
    }

    pub fn tank_temp(&self) -> &Path {
        self.run.tank_temp()
    }

    pub fn project(&self) -> &Entity {
        &self.project
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// `<project_root>/tank/config`.
    pub fn project_config(&self) -> &Path {
        &self.project_config
    }

    pub fn alt_root_1(&self) -> Option<&Path> {
        self.alt_root_1.as_deref()
    }

    pub fn alt_root_2(&self) -> Option<&Path> {
        self.alt_root_2.as_deref()
    }

    pub fn tk(&self) -> &Toolkit<MockRecordStore> {
        &self.tk
    }

    pub fn tk_mut(&mut self) -> &mut Toolkit<MockRecordStore> {
        &mut self.tk
    }

    pub fn pipeline_configuration(&self) -> &PipelineConfiguration {
        self.tk.pipeline_configuration()
    }

    /// Copy `<test data>/<core_config>` into `config/core` plus the `env`,
    /// `hooks`, `test_app` and `test_engine` folders, then point the test
    /// environment at the copied app and engine.
    ///
    /// Templates are reloaded except for [`MULTI_ROOT_CORE`], whose templates
    /// only resolve once the extra roots exist.
    pub fn setup_fixtures(&mut self, core_config: &str) -> Result<(), FixtureError> {
        self.ensure_active()?;
        let test_data = self.run.test_data_path().to_path_buf();

        copy_folder(&test_data.join(core_config), &self.project_config.join("core"))?;
        for dir in CONFIG_DIRS {
            copy_folder(&test_data.join(dir), &self.project_config.join(dir))?;
        }

        let env_src = test_data.join("env").join(TEST_ENV_FILE);
        let env_text = fs::read_to_string(&env_src).map_err(io_err("reading", &env_src))?;
        let app_path = self.project_config.join("test_app");
        let engine_path = self.project_config.join("test_engine");
        let env_text = env_text
            .replace(APP_LOCATION_TOKEN, &app_path.to_string_lossy())
            .replace(ENGINE_LOCATION_TOKEN, &engine_path.to_string_lossy());
        self.create_file(&self.project_config.join("env").join(TEST_ENV_FILE), &env_text)?;

        if core_config != MULTI_ROOT_CORE {
            self.tk.reload_templates()?;
        }
        Ok(())
    }

    /// [`setup_fixtures`](Self::setup_fixtures) with the default core.
    pub fn setup_default_fixtures(&mut self) -> Result<(), FixtureError> {
        self.setup_fixtures(DEFAULT_CORE)
    }

    /// Provision `alternate_1` and `alternate_2` storage roots next to the
    /// primary one, register the project under each and create its folders.
    pub fn setup_multi_root_fixtures(&mut self) -> Result<(), FixtureError> {
        self.setup_fixtures(MULTI_ROOT_CORE)?;

        let project_dir_name = self
            .project_root
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        let alt_1 = self.tank_temp().join("alternate_1").join(&project_dir_name);
        let alt_2 = self.tank_temp().join("alternate_2").join(&project_dir_name);

        let project_tank = self.project_root.join("tank");
        let back_link = BackLink::uniform(&project_tank).render();
        for alt in [&alt_1, &alt_2] {
            self.create_file(&alt.join("tank").join(BACK_LINK_FILE), &back_link)?;
        }

        let parent = |p: &Path| p.parent().unwrap_or(p).to_path_buf();
        let mut roots = RootsConfig::new();
        roots.insert(PRIMARY_ROOT.to_string(), RootPaths::uniform(&parent(&self.project_root)));
        roots.insert("alternate_1".to_string(), RootPaths::uniform(&parent(&alt_1)));
        roots.insert("alternate_2".to_string(), RootPaths::uniform(&parent(&alt_2)));
        self.create_file(&project_tank.join(ROOTS_FILE), &render_roots(&roots)?)?;

        self.alt_root_1 = Some(alt_1.clone());
        self.alt_root_2 = Some(alt_2.clone());

        let pc = PipelineConfiguration::from_path(&project_tank)?;
        self.tk.set_pipeline_configuration(pc);
        self.tk.reload_templates()?;

        let project = self.project.clone();
        self.add_production_path(&alt_1, Some(&project))?;
        self.add_production_path(&alt_2, Some(&project))?;

        self.tk.create_filesystem_structure(PROJECT_TYPE, project.id)?;
        Ok(())
    }

    /// Create `path` (relative to the project root unless absolute) and, if
    /// `entity` is given, register it in the path cache and the mock store.
    pub fn add_production_path(&mut self, path: &Path, entity: Option<&Entity>) -> Result<(), FixtureError> {
        self.ensure_active()?;
        let full_path = self.project_root.join(path);
        if !full_path.exists() {
            fs::create_dir_all(&full_path).map_err(io_err("creating", &full_path))?;
        }
        if let Some(entity) = entity {
            let mut entity = entity.clone();
            entity.fill_name_from_code();
            self.add_to_path_cache(&full_path, &entity)?;
            self.add_to_sg_mock_db([entity])?;
        }
        Ok(())
    }

    /// Record `path` as the primary location of `entity`. A `code` stands in
    /// for a missing `name`. The cache handle is closed before returning.
    pub fn add_to_path_cache(&self, path: &Path, entity: &Entity) -> Result<(), FixtureError> {
        self.ensure_active()?;
        let row = PathCacheRow {
            entity: entity.to_link(),
            path: path.to_path_buf(),
            primary: true,
            metadata: Vec::new(),
        };
        let mut cache = PathCache::open(self.tk.pipeline_configuration())?;
        let added = cache.add_mappings(std::slice::from_ref(&row));
        cache.close()?;
        Ok(added?)
    }

    /// Insert entities into the mock store as live records.
    pub fn add_to_sg_mock_db<I>(&mut self, entities: I) -> Result<(), FixtureError>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.ensure_active()?;
        for mut entity in entities {
            entity.retired = false;
            self.tk.store_mut().insert(entity)?;
        }
        Ok(())
    }

    /// Like [`add_to_sg_mock_db`](Self::add_to_sg_mock_db) for a JSON object
    /// or an array of them.
    pub fn add_json_to_sg_mock_db(&mut self, value: Value) -> Result<(), FixtureError> {
        let values = match value {
            Value::Array(items) => items,
            single => vec![single],
        };
        let entities = values
            .into_iter()
            .map(Entity::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.add_to_sg_mock_db(entities)
    }

    /// Write `data` to `file_path`, creating parent directories. Only paths
    /// inside the run's data area are accepted.
    pub fn create_file(&self, file_path: &Path, data: &str) -> Result<(), FixtureError> {
        Ok(create_file_within(self.tank_temp(), file_path, data)?)
    }

    /// Text dump of the mock store and every path cache row.
    pub fn debug_dump(&self) -> Result<String, FixtureError> {
        let cache = PathCache::open(self.tk.pipeline_configuration())?;
        let rows = cache.rows();
        cache.close()?;

        let rule = "-".repeat(77);
        let mut out = format!("{rule}\n Shotgun contents:\n{}\n\nPath Cache contents:\n", self.tk.store().dump());
        for row in rows? {
            out.push_str(&format!(
                "({}, {}, {}, {}, {}, {})\n",
                row.entity.entity_type, row.entity.id, row.entity.name, row.root, row.relative_path, row.primary
            ));
        }
        out.push_str(&rule);
        out.push('\n');
        Ok(out)
    }

    /// Rotate the project tree and any alternate roots to backups. The
    /// fixture is unusable afterwards.
    pub fn tear_down(&mut self) -> Result<(), FixtureError> {
        let next = self.state.advance(FixtureState::RotatedToBackup)?;
        self.run.rotate(&self.project_root)?;
        for alt in [&self.alt_root_1, &self.alt_root_2].into_iter().flatten() {
            self.run.rotate(alt)?;
        }
        self.state = next;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), FixtureError> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(FixtureError::NotActive(self.state))
        }
    }
}
