//! FILENAME: app/batch/src/steps.rs
//! PURPOSE: Step list model: JSON descriptors and the typed operations built
//! from them.
//! CONTEXT: A step file is a JSON array of `{"operation": name, "params": {...}}`.
//! Each descriptor is turned into an `Operation` when the list is loaded, so
//! unknown operations, bad parameters and malformed ranges are caught before
//! any workbook is touched. A step that fails to build is kept in the list
//! and reported as failed when the batch runs; the other steps still run.

use std::fmt;
use std::path::Path;

use engine::{Axis, CellRange, Color, DeleteMergePolicy, EditError, ErrorKind, Position, RangeSpec, UnmergeValuePolicy};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::BatchError;

// ============================================================================
// OPERATION NAMES
// ============================================================================

/// Every operation a step may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationCode {
    ConvertFormulasToValues,
    ProcessMergedCellsAll,
    ProcessMergedCellsSpecific,
    MergeCells,
    CreateWorksheet,
    DeleteWorksheet,
    InsertRows,
    DeleteRows,
    HideRows,
    UnhideRows,
    DeleteHiddenRows,
    InsertColumns,
    DeleteColumns,
    HideColumns,
    UnhideColumns,
    DeleteHiddenColumns,
    ChangeFontColor,
    ChangeFillColor,
    AddBorder,
    RemoveBorder,
    ModifyCellContent,
}

impl OperationCode {
    pub const ALL: [OperationCode; 21] = [
        OperationCode::ConvertFormulasToValues,
        OperationCode::ProcessMergedCellsAll,
        OperationCode::ProcessMergedCellsSpecific,
        OperationCode::MergeCells,
        OperationCode::CreateWorksheet,
        OperationCode::DeleteWorksheet,
        OperationCode::InsertRows,
        OperationCode::DeleteRows,
        OperationCode::HideRows,
        OperationCode::UnhideRows,
        OperationCode::DeleteHiddenRows,
        OperationCode::InsertColumns,
        OperationCode::DeleteColumns,
        OperationCode::HideColumns,
        OperationCode::UnhideColumns,
        OperationCode::DeleteHiddenColumns,
        OperationCode::ChangeFontColor,
        OperationCode::ChangeFillColor,
        OperationCode::AddBorder,
        OperationCode::RemoveBorder,
        OperationCode::ModifyCellContent,
    ];

    /// Name used in step files.
    pub fn name(&self) -> &'static str {
        match self {
            OperationCode::ConvertFormulasToValues => "convert_formulas_to_values",
            OperationCode::ProcessMergedCellsAll => "process_merged_cells_all",
            OperationCode::ProcessMergedCellsSpecific => "process_merged_cells_specific",
            OperationCode::MergeCells => "merge_cells",
            OperationCode::CreateWorksheet => "create_worksheet",
            OperationCode::DeleteWorksheet => "delete_worksheet",
            OperationCode::InsertRows => "insert_rows",
            OperationCode::DeleteRows => "delete_rows",
            OperationCode::HideRows => "hide_rows",
            OperationCode::UnhideRows => "unhide_rows",
            OperationCode::DeleteHiddenRows => "delete_hidden_rows",
            OperationCode::InsertColumns => "insert_columns",
            OperationCode::DeleteColumns => "delete_columns",
            OperationCode::HideColumns => "hide_columns",
            OperationCode::UnhideColumns => "unhide_columns",
            OperationCode::DeleteHiddenColumns => "delete_hidden_columns",
            OperationCode::ChangeFontColor => "change_font_color",
            OperationCode::ChangeFillColor => "change_fill_color",
            OperationCode::AddBorder => "add_border",
            OperationCode::RemoveBorder => "remove_border",
            OperationCode::ModifyCellContent => "modify_cell_content",
        }
    }

    /// Name shown in the report.
    pub fn display_name(&self) -> &'static str {
        match self {
            OperationCode::ConvertFormulasToValues => "公式转值",
            OperationCode::ProcessMergedCellsAll => "拆分所有合并单元格",
            OperationCode::ProcessMergedCellsSpecific => "拆分指定范围合并单元格",
            OperationCode::MergeCells => "合并单元格",
            OperationCode::CreateWorksheet => "新建工作表",
            OperationCode::DeleteWorksheet => "删除工作表",
            OperationCode::InsertRows => "插入行",
            OperationCode::DeleteRows => "删除行",
            OperationCode::HideRows => "隐藏行",
            OperationCode::UnhideRows => "取消隐藏行",
            OperationCode::DeleteHiddenRows => "删除隐藏行",
            OperationCode::InsertColumns => "插入列",
            OperationCode::DeleteColumns => "删除列",
            OperationCode::HideColumns => "隐藏列",
            OperationCode::UnhideColumns => "取消隐藏列",
            OperationCode::DeleteHiddenColumns => "删除隐藏列",
            OperationCode::ChangeFontColor => "修改字体颜色",
            OperationCode::ChangeFillColor => "修改填充颜色",
            OperationCode::AddBorder => "添加单元格边框",
            OperationCode::RemoveBorder => "移除单元格边框",
            OperationCode::ModifyCellContent => "修改单元格内容",
        }
    }

    pub fn from_name(name: &str) -> Option<OperationCode> {
        OperationCode::ALL.iter().copied().find(|code| code.name() == name)
    }
}

// ============================================================================
// TYPED OPERATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralEdit {
    Insert,
    Delete,
    Hide,
    Unhide,
}

/// Cells a formatting step applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeTarget {
    Specific(RangeSpec),
    EntireSheet,
}

/// A validated step, ready to dispatch.
/// `sheet_indexes` and `policy` left as None fall back to the batch config.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ConvertFormulasToValues,
    UnmergeAll {
        policy: UnmergeValuePolicy,
    },
    UnmergeRange {
        range: RangeSpec,
        policy: UnmergeValuePolicy,
    },
    Merge {
        rect: CellRange,
        sheet_indexes: Option<Vec<usize>>,
    },
    CreateWorksheet {
        name: String,
    },
    DeleteWorksheet {
        name: String,
    },
    Structural {
        edit: StructuralEdit,
        axis: Axis,
        positions: Vec<Position>,
        sheet_indexes: Option<Vec<usize>>,
        policy: Option<DeleteMergePolicy>,
    },
    DeleteHidden {
        axis: Axis,
        sheet_indexes: Option<Vec<usize>>,
        policy: Option<DeleteMergePolicy>,
    },
    FontColor {
        color: Color,
        target: RangeTarget,
    },
    FillColor {
        color: Color,
        target: RangeTarget,
    },
    Border {
        add: bool,
        target: RangeTarget,
    },
    SetContent {
        range: RangeSpec,
        content: String,
    },
}

impl Operation {
    pub fn code(&self) -> OperationCode {
        match self {
            Operation::ConvertFormulasToValues => OperationCode::ConvertFormulasToValues,
            Operation::UnmergeAll { .. } => OperationCode::ProcessMergedCellsAll,
            Operation::UnmergeRange { .. } => OperationCode::ProcessMergedCellsSpecific,
            Operation::Merge { .. } => OperationCode::MergeCells,
            Operation::CreateWorksheet { .. } => OperationCode::CreateWorksheet,
            Operation::DeleteWorksheet { .. } => OperationCode::DeleteWorksheet,
            Operation::Structural { edit, axis, .. } => match (edit, axis) {
                (StructuralEdit::Insert, Axis::Row) => OperationCode::InsertRows,
                (StructuralEdit::Delete, Axis::Row) => OperationCode::DeleteRows,
                (StructuralEdit::Hide, Axis::Row) => OperationCode::HideRows,
                (StructuralEdit::Unhide, Axis::Row) => OperationCode::UnhideRows,
                (StructuralEdit::Insert, Axis::Column) => OperationCode::InsertColumns,
                (StructuralEdit::Delete, Axis::Column) => OperationCode::DeleteColumns,
                (StructuralEdit::Hide, Axis::Column) => OperationCode::HideColumns,
                (StructuralEdit::Unhide, Axis::Column) => OperationCode::UnhideColumns,
            },
            Operation::DeleteHidden { axis: Axis::Row, .. } => OperationCode::DeleteHiddenRows,
            Operation::DeleteHidden { axis: Axis::Column, .. } => OperationCode::DeleteHiddenColumns,
            Operation::FontColor { .. } => OperationCode::ChangeFontColor,
            Operation::FillColor { .. } => OperationCode::ChangeFillColor,
            Operation::Border { add: true, .. } => OperationCode::AddBorder,
            Operation::Border { add: false, .. } => OperationCode::RemoveBorder,
            Operation::SetContent { .. } => OperationCode::ModifyCellContent,
        }
    }
}

// ============================================================================
// COLOURS
// ============================================================================

const PALETTE: [(&str, &str, u32); 9] = [
    ("红色", "red", 0xFF0000),
    ("绿色", "green", 0x00FF00),
    ("蓝色", "blue", 0x0000FF),
    ("黑色", "black", 0x000000),
    ("白色", "white", 0xFFFFFF),
    ("黄色", "yellow", 0xFFFF00),
    ("紫色", "purple", 0x800080),
    ("橙色", "orange", 0xFFA500),
    ("灰色", "gray", 0x808080),
];

/// Resolves a palette name (Chinese or English) or `#RRGGBB`.
pub fn resolve_color(name: &str) -> Option<Color> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix('#') {
        return Color::from_hex(hex);
    }
    PALETTE
        .iter()
        .find(|(zh, en, _)| *zh == name || en.eq_ignore_ascii_case(name))
        .map(|(_, _, rgb)| Color::new((rgb >> 16) as u8, (rgb >> 8) as u8, *rgb as u8))
}

fn color_or_black(name: &str) -> Color {
    resolve_color(name).unwrap_or_else(|| {
        warn!(target: "STEP", "unknown colour '{}', using black", name);
        Color::black()
    })
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// A step as written in a step file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub operation: String,
    #[serde(default)]
    pub params: Value,
}

impl StepDescriptor {
    pub fn new(operation: &str, params: Value) -> Self {
        StepDescriptor {
            operation: operation.to_string(),
            params,
        }
    }

    /// Older step files nest the real descriptor inside `params`.
    fn normalized(&self) -> StepDescriptor {
        if let Some(Value::String(inner)) = self.params.get("operation") {
            let params = self.params.get("params").cloned().unwrap_or(Value::Null);
            return StepDescriptor::new(inner, params);
        }
        self.clone()
    }
}

/// Why a descriptor could not be turned into an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepError {
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl StepError {
    fn new(message: impl Into<String>) -> Self {
        StepError {
            kind: None,
            message: message.into(),
        }
    }
}

impl From<parser::ParseError> for StepError {
    fn from(e: parser::ParseError) -> Self {
        let e = EditError::from(e);
        StepError {
            kind: Some(e.kind()),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{}: {}", kind, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum UnmergeAction {
    #[default]
    Unmerge,
    KeepValue,
}

impl UnmergeAction {
    fn policy(self) -> UnmergeValuePolicy {
        match self {
            UnmergeAction::Unmerge => UnmergeValuePolicy::Discard,
            UnmergeAction::KeepValue => UnmergeValuePolicy::Broadcast,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RangeMode {
    #[default]
    Specific,
    EntireSheet,
}

#[derive(Deserialize)]
struct ActionParams {
    #[serde(default)]
    action: UnmergeAction,
}

#[derive(Deserialize)]
struct RangeActionParams {
    range_str: String,
    #[serde(default)]
    action: UnmergeAction,
}

#[derive(Deserialize)]
struct MergeParams {
    range_str: String,
    sheet_indexes: Option<Vec<usize>>,
}

#[derive(Deserialize)]
struct SheetNameParams {
    sheet_name: String,
}

#[derive(Deserialize)]
struct PositionParams {
    position: String,
    sheet_indexes: Option<Vec<usize>>,
    merge_mode: Option<DeleteMergePolicy>,
}

#[derive(Deserialize)]
struct HiddenParams {
    sheet_indexes: Option<Vec<usize>>,
    merge_mode: Option<DeleteMergePolicy>,
}

#[derive(Deserialize)]
struct RangeParams {
    #[serde(default)]
    range_mode: RangeMode,
    range_str: Option<String>,
}

#[derive(Deserialize)]
struct ColorParams {
    color: String,
    #[serde(flatten)]
    range: RangeParams,
}

#[derive(Deserialize)]
struct ContentParams {
    position: String,
    #[serde(default)]
    content: String,
}

fn params_of<T: DeserializeOwned>(params: &Value) -> Result<T, StepError> {
    let params = if params.is_null() { Value::Object(Map::new()) } else { params.clone() };
    serde_json::from_value(params).map_err(|e| StepError::new(format!("invalid params: {}", e)))
}

fn target_of(params: RangeParams) -> Result<RangeTarget, StepError> {
    match params.range_mode {
        RangeMode::EntireSheet => Ok(RangeTarget::EntireSheet),
        RangeMode::Specific => {
            let range_str = params.range_str.unwrap_or_default();
            Ok(RangeTarget::Specific(parser::parse_range(&range_str)?))
        }
    }
}

fn structural(code: OperationCode) -> Option<(StructuralEdit, Axis)> {
    Some(match code {
        OperationCode::InsertRows => (StructuralEdit::Insert, Axis::Row),
        OperationCode::DeleteRows => (StructuralEdit::Delete, Axis::Row),
        OperationCode::HideRows => (StructuralEdit::Hide, Axis::Row),
        OperationCode::UnhideRows => (StructuralEdit::Unhide, Axis::Row),
        OperationCode::InsertColumns => (StructuralEdit::Insert, Axis::Column),
        OperationCode::DeleteColumns => (StructuralEdit::Delete, Axis::Column),
        OperationCode::HideColumns => (StructuralEdit::Hide, Axis::Column),
        OperationCode::UnhideColumns => (StructuralEdit::Unhide, Axis::Column),
        _ => return None,
    })
}

fn structural_operation(
    code: OperationCode,
    edit: StructuralEdit,
    axis: Axis,
    params: &Value,
) -> Result<Operation, StepError> {
    let p: PositionParams = params_of(params)?;
    let positions = parser::parse_positions(&p.position, axis)?;
    if edit != StructuralEdit::Delete && p.merge_mode.is_some() {
        warn!(target: "STEP", "{}: merge_mode only applies to deletions, ignored", code.name());
    }
    Ok(Operation::Structural {
        edit,
        axis,
        positions,
        sheet_indexes: p.sheet_indexes,
        policy: p.merge_mode,
    })
}

/// Builds the typed operation of a descriptor.
pub fn build_operation(descriptor: &StepDescriptor) -> Result<Operation, StepError> {
    let descriptor = descriptor.normalized();
    let code = OperationCode::from_name(&descriptor.operation)
        .ok_or_else(|| StepError::new(format!("unknown operation '{}'", descriptor.operation)))?;
    let params = &descriptor.params;

    let operation = match code {
        OperationCode::ConvertFormulasToValues => Operation::ConvertFormulasToValues,
        OperationCode::ProcessMergedCellsAll => {
            let p: ActionParams = params_of(params)?;
            Operation::UnmergeAll { policy: p.action.policy() }
        }
        OperationCode::ProcessMergedCellsSpecific => {
            let p: RangeActionParams = params_of(params)?;
            Operation::UnmergeRange {
                range: parser::parse_range(&p.range_str)?,
                policy: p.action.policy(),
            }
        }
        OperationCode::MergeCells => {
            let p: MergeParams = params_of(params)?;
            Operation::Merge {
                rect: parser::parse_cell_range(&p.range_str)?,
                sheet_indexes: p.sheet_indexes,
            }
        }
        OperationCode::CreateWorksheet | OperationCode::DeleteWorksheet => {
            let p: SheetNameParams = params_of(params)?;
            let name = p.sheet_name.trim().to_string();
            if name.is_empty() {
                return Err(StepError::new("sheet_name must not be empty"));
            }
            if code == OperationCode::CreateWorksheet {
                Operation::CreateWorksheet { name }
            } else {
                Operation::DeleteWorksheet { name }
            }
        }
        OperationCode::DeleteHiddenRows | OperationCode::DeleteHiddenColumns => {
            let p: HiddenParams = params_of(params)?;
            Operation::DeleteHidden {
                axis: if code == OperationCode::DeleteHiddenRows { Axis::Row } else { Axis::Column },
                sheet_indexes: p.sheet_indexes,
                policy: p.merge_mode,
            }
        }
        OperationCode::ChangeFontColor => {
            let p: ColorParams = params_of(params)?;
            Operation::FontColor {
                color: color_or_black(&p.color),
                target: target_of(p.range)?,
            }
        }
        OperationCode::ChangeFillColor => {
            let p: ColorParams = params_of(params)?;
            Operation::FillColor {
                color: color_or_black(&p.color),
                target: target_of(p.range)?,
            }
        }
        OperationCode::AddBorder | OperationCode::RemoveBorder => {
            let p: RangeParams = params_of(params)?;
            Operation::Border {
                add: code == OperationCode::AddBorder,
                target: target_of(p)?,
            }
        }
        OperationCode::ModifyCellContent => {
            let p: ContentParams = params_of(params)?;
            Operation::SetContent {
                range: parser::parse_range(&p.position)?,
                content: p.content,
            }
        }
        _ => match structural(code) {
            Some((edit, axis)) => structural_operation(code, edit, axis, params)?,
            None => return Err(StepError::new(format!("operation '{}' has no builder", code.name()))),
        },
    };
    Ok(operation)
}

// ============================================================================
// STEP LIST
// ============================================================================

/// One step of a list: what was written, and what it built into.
#[derive(Debug, Clone)]
pub struct StepEntry {
    pub descriptor: StepDescriptor,
    pub operation: Result<Operation, StepError>,
}

impl StepEntry {
    pub fn new(descriptor: StepDescriptor) -> Self {
        let operation = build_operation(&descriptor);
        StepEntry { descriptor, operation }
    }

    /// Report name of the step; the raw name when it is unknown.
    pub fn display_name(&self) -> String {
        match OperationCode::from_name(&self.descriptor.normalized().operation) {
            Some(code) => code.display_name().to_string(),
            None => self.descriptor.operation.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepList {
    pub entries: Vec<StepEntry>,
}

impl StepList {
    pub fn from_descriptors(descriptors: Vec<StepDescriptor>) -> Self {
        StepList {
            entries: descriptors.into_iter().map(StepEntry::new).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        let value: Value = serde_json::from_str(json).map_err(|e| BatchError::json("step list", e))?;
        if !value.is_array() {
            return Err(BatchError::NotAStepList);
        }
        let descriptors: Vec<StepDescriptor> =
            serde_json::from_value(value).map_err(|e| BatchError::json("step list", e))?;
        Ok(StepList::from_descriptors(descriptors))
    }

    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let json = std::fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
        StepList::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, BatchError> {
        let descriptors: Vec<&StepDescriptor> = self.entries.iter().map(|e| &e.descriptor).collect();
        serde_json::to_string_pretty(&descriptors).map_err(|e| BatchError::json("step list", e))
    }

    pub fn save(&self, path: &Path) -> Result<(), BatchError> {
        std::fs::write(path, self.to_json()?).map_err(|e| BatchError::io(path, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Steps that failed to build, numbered from 1.
    pub fn errors(&self) -> Vec<(usize, &StepError)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.operation.as_ref().err().map(|e| (i + 1, e)))
            .collect()
    }

    /// An example list covering the common operations.
    pub fn template() -> StepList {
        StepList::from_descriptors(vec![
            StepDescriptor::new("convert_formulas_to_values", json!({})),
            StepDescriptor::new("merge_cells", json!({"range_str": "A1:C1", "sheet_indexes": [0]})),
            StepDescriptor::new(
                "process_merged_cells_specific",
                json!({"range_str": "B2:C3", "action": "keep_value"}),
            ),
            StepDescriptor::new("insert_rows", json!({"position": "2", "sheet_indexes": [0]})),
            StepDescriptor::new(
                "delete_rows",
                json!({"position": "5,8:9", "sheet_indexes": [0], "merge_mode": "unmerge_keep_value"}),
            ),
            StepDescriptor::new("hide_columns", json!({"position": "D:E"})),
            StepDescriptor::new("delete_hidden_rows", json!({"merge_mode": "unmerge_only"})),
            StepDescriptor::new(
                "change_fill_color",
                json!({"color": "黄色", "range_mode": "specific", "range_str": "A1:C1"}),
            ),
            StepDescriptor::new("add_border", json!({"range_str": "A1:C10"})),
            StepDescriptor::new("modify_cell_content", json!({"position": "A1", "content": "Summary"})),
            StepDescriptor::new("create_worksheet", json!({"sheet_name": "Notes"})),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(operation: &str, params: Value) -> Result<Operation, StepError> {
        build_operation(&StepDescriptor::new(operation, params))
    }

    #[test]
    fn test_names_round_trip() {
        for code in OperationCode::ALL {
            assert_eq!(OperationCode::from_name(code.name()), Some(code));
        }
        assert_eq!(OperationCode::from_name("process_merged_cells"), None);
    }

    #[test]
    fn test_structural_steps_parse_positions() {
        let op = build("delete_rows", json!({"position": "1，3：5", "merge_mode": "unmerge_only"})).unwrap();
        match &op {
            Operation::Structural { edit, axis, positions, policy, .. } => {
                assert_eq!(*edit, StructuralEdit::Delete);
                assert_eq!(*axis, Axis::Row);
                assert_eq!(positions, &vec![Position::Index(1), Position::IndexRange(3, 5)]);
                assert_eq!(*policy, Some(DeleteMergePolicy::UnmergeOnly));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(op.code(), OperationCode::DeleteRows);

        let op = build("hide_columns", json!({"position": "c:e"})).unwrap();
        assert_eq!(op.code(), OperationCode::HideColumns);
    }

    #[test]
    fn test_axis_mismatch_is_rejected() {
        let err = build("insert_rows", json!({"position": "1,A"})).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InconsistentAxis));
    }

    #[test]
    fn test_bad_range_is_rejected_with_kind() {
        let err = build("merge_cells", json!({"range_str": "A1:B"})).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedRange));
    }

    #[test]
    fn test_unknown_operation_and_missing_params() {
        let err = build("explode", json!({})).unwrap_err();
        assert!(err.kind.is_none());
        assert!(err.message.contains("explode"));

        let err = build("delete_rows", json!({})).unwrap_err();
        assert!(err.message.contains("position"));

        let err = build("delete_rows", json!({"position": "2", "merge_mode": "sometimes"})).unwrap_err();
        assert!(err.message.contains("invalid params"));
    }

    #[test]
    fn test_null_params_are_empty() {
        let op = build("process_merged_cells_all", Value::Null).unwrap();
        assert_eq!(op, Operation::UnmergeAll { policy: UnmergeValuePolicy::Discard });
    }

    #[test]
    fn test_nested_descriptor_is_unwrapped() {
        let nested = StepDescriptor::new(
            "合并单元格",
            json!({"operation": "merge_cells", "params": {"range_str": "A1:B1"}}),
        );
        let op = build_operation(&nested).unwrap();
        assert_eq!(op.code(), OperationCode::MergeCells);
    }

    #[test]
    fn test_colours() {
        assert_eq!(resolve_color("红色"), Some(Color::new(255, 0, 0)));
        assert_eq!(resolve_color("Orange"), Some(Color::new(0xFF, 0xA5, 0x00)));
        assert_eq!(resolve_color("#336699"), Some(Color::new(0x33, 0x66, 0x99)));
        assert_eq!(resolve_color("mauve"), None);

        let op = build("change_font_color", json!({"color": "mauve", "range_str": "A1"})).unwrap();
        assert!(matches!(op, Operation::FontColor { color, .. } if color == Color::black()));
    }

    #[test]
    fn test_non_ascii_hex_colour_falls_back_to_black() {
        assert_eq!(resolve_color("#红色"), None);
        assert_eq!(resolve_color("#FF红色"), None);

        let op = build("change_font_color", json!({"color": "#红色", "range_str": "A1"})).unwrap();
        assert!(matches!(op, Operation::FontColor { color, .. } if color == Color::black()));
        let op = build("change_fill_color", json!({"color": "#FF红色", "range_str": "A1"})).unwrap();
        assert!(matches!(op, Operation::FillColor { color, .. } if color == Color::black()));
    }

    #[test]
    fn test_range_modes() {
        let op = build("change_fill_color", json!({"color": "黄色", "range_mode": "entire_sheet"})).unwrap();
        assert!(matches!(op, Operation::FillColor { target: RangeTarget::EntireSheet, .. }));

        let err = build("remove_border", json!({"range_mode": "specific"})).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedRange));
    }

    #[test]
    fn test_step_list_keeps_invalid_entries() {
        let list = StepList::from_json(
            r#"[
                {"operation": "insert_rows", "params": {"position": "2"}},
                {"operation": "delete_worksheet", "params": {"sheet_name": "  "}},
                {"operation": "convert_formulas_to_values"}
            ]"#,
        )
        .unwrap();

        assert_eq!(list.len(), 3);
        let errors = list.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, 2);
        assert_eq!(list.entries[1].display_name(), "删除工作表");
    }

    #[test]
    fn test_step_list_must_be_an_array() {
        assert!(matches!(StepList::from_json(r#"{"operation": "x"}"#), Err(BatchError::NotAStepList)));
        assert!(matches!(StepList::from_json("[1, 2]"), Err(BatchError::Json { .. })));
    }

    #[test]
    fn test_template_is_valid_and_exports() {
        let template = StepList::template();
        assert!(template.errors().is_empty());

        let reparsed = StepList::from_json(&template.to_json().unwrap()).unwrap();
        assert_eq!(reparsed.len(), template.len());
        assert_eq!(reparsed.entries[1].descriptor, template.entries[1].descriptor);
    }
}
