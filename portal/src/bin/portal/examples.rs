use crate::commands::{department, field, init, publication, record, report, user};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "init",
            groups: init::EXAMPLES,
        },
        CommandExample {
            name: "user",
            groups: user::EXAMPLES,
        },
        CommandExample {
            name: "department",
            groups: department::EXAMPLES,
        },
        CommandExample {
            name: "field",
            groups: field::EXAMPLES,
        },
        CommandExample {
            name: "record",
            groups: record::EXAMPLES,
        },
        CommandExample {
            name: "publication",
            groups: publication::EXAMPLES,
        },
        CommandExample {
            name: "report",
            groups: report::EXAMPLES,
        },
    ]
}
