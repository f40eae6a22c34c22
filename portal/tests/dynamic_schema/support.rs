pub(crate) use portal::{
    AbstractType, ActingUser, AddColumnOutcome, DatabaseConfig, DropColumnOutcome, EntityTable, FieldSpec, NewUser,
    Portal, PortalError, RejectReason, ReportKind, TypedValue, form,
};
pub(crate) use tempfile::TempDir;

/// A portal on a fresh on-disk database with one user per role.
pub(crate) struct TestPortal {
    pub(crate) dir: TempDir,
    pub(crate) portal: Portal,
    pub(crate) admin: ActingUser,
    pub(crate) faculty: ActingUser,
    pub(crate) user: ActingUser,
}

impl TestPortal {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let portal = Portal::open(DatabaseConfig::new(dir.path().join("portal.db"))).expect("open portal");

        let register = |name: &str, role: &str| {
            let user = portal
                .register_user(&NewUser::new(name, format!("{}@example.edu", name.to_lowercase()), role))
                .expect("register user");
            portal.acting_user(user.id).expect("resolve user")
        };
        let admin = register("Ada", "admin");
        let faculty = register("Bo", "faculty");
        let user = register("Cy", "user");

        Self {
            dir,
            portal,
            admin,
            faculty,
            user,
        }
    }

    pub(crate) fn add_field(&self, spec: FieldSpec) -> AddColumnOutcome {
        self.portal.add_field(&self.admin, &spec).expect("add field")
    }

    pub(crate) fn config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.dir.path().join("portal.db"))
    }
}
