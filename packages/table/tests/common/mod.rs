#![allow(dead_code)]

use tablekit_editor::{Document, Origin, PopoverRegistry};
use tablekit_table::{CellAddr, Hit, MemoryHost, PointerEvent, PointerTarget, TableConfig, TableData, TableTool, ToolContext};

pub struct Env {
    pub doc: Document,
    pub host: MemoryHost,
    pub menus: PopoverRegistry,
}

impl Env {
    pub fn new() -> Self {
        Self {
            doc: Document::new(),
            host: MemoryHost::new(),
            menus: PopoverRegistry::new(),
        }
    }

    pub fn cx(&mut self) -> ToolContext<'_> {
        ToolContext::new(&mut self.doc, &mut self.host, &mut self.menus)
    }
}

/// Mounted table created from JSON data; creation is not an undo step
pub fn table(json: &str) -> (Env, TableTool) {
    let mut env = Env::new();
    let data: TableData = serde_json::from_str(json).unwrap();
    let mut tool = TableTool::create(&mut env.doc, None, &data, TableConfig::default(), Origin::Silent).unwrap();
    tool.mount(&mut env.host);
    env.doc.drain_events();
    (env, tool)
}

pub fn texts(env: &Env, tool: &TableTool) -> Vec<Vec<String>> {
    tool.grid()
        .rows()
        .iter()
        .map(|row| row.iter().map(|cell| cell.texts(&env.doc).join("\n")).collect())
        .collect()
}

/// Drag-select from one cell to another over content
pub fn drag_select(env: &mut Env, tool: &mut TableTool, from: CellAddr, to: CellAddr) {
    let mut cx = env.cx();
    tool.handle_pointer(
        &mut cx,
        PointerEvent::Down {
            hit: Hit::Cell {
                addr: from,
                target: PointerTarget::Content,
            },
            x: 10.0,
            y: 10.0,
            shift: false,
        },
    )
    .unwrap();
    tool.handle_pointer(
        &mut cx,
        PointerEvent::Move {
            cell: Some(to),
            x: 20.0,
            y: 20.0,
        },
    )
    .unwrap();
    tool.handle_pointer(&mut cx, PointerEvent::Up { x: 20.0, y: 20.0 }).unwrap();
}

/// The block the host has focused lies in some cell of the table
pub fn focus_in_table(env: &Env, tool: &TableTool) -> bool {
    use tablekit_table::BlockHost;
    env.host
        .focused()
        .is_some_and(|block| tool.grid().locate_block(block).is_some())
}
