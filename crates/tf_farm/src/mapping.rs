// crates/tf_farm/src/mapping.rs

//! ControlMapping - 农场属性与扁平控制向量的双向映射
//!
//! 槽位顺序在构建时固定：
//!
//! - 离散农场：先按设备编号排列全部摩擦槽（若控制摩擦），
//!   再按设备编号排列 (x, y) 位置槽对（若控制位置）
//! - 连续农场：每个网格单元一个槽，行优先
//!
//! `decode(encode(farm))` 对所有受控属性是无损的：编码只做拷贝，不做任何变换。

use tf_config::ControlSelection;
use tf_foundation::{TfError, TfResult};

use crate::model::{FarmLayout, FarmModel};

/// 槽位对应的属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// 设备摩擦系数
    Friction,
    /// 设备 x 坐标
    PositionX,
    /// 设备 y 坐标
    PositionY,
    /// 连续场单元值
    FieldCell,
}

/// 控制槽位：属性 + 所属实体编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlSlot {
    /// 属性
    pub kind: SlotKind,
    /// 设备编号或单元编号
    pub entity: usize,
}

/// 控制映射
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMapping {
    selection: ControlSelection,
    continuous: bool,
    n_entities: usize,
    slots: Vec<ControlSlot>,
}

impl ControlMapping {
    /// 按农场当前形状和控制量选择构建映射
    ///
    /// 连续农场只支持 [`ControlSelection::Friction`]。
    pub fn build(farm: &FarmModel, selection: ControlSelection) -> TfResult<Self> {
        let n = farm.n_entities();
        let mut slots = Vec::new();
        match farm.layout() {
            FarmLayout::Discrete(_) => {
                if selection.controls_friction() {
                    slots.extend((0..n).map(|entity| ControlSlot { kind: SlotKind::Friction, entity }));
                }
                if selection.controls_position() {
                    for entity in 0..n {
                        slots.push(ControlSlot { kind: SlotKind::PositionX, entity });
                        slots.push(ControlSlot { kind: SlotKind::PositionY, entity });
                    }
                }
            }
            FarmLayout::Continuous(_) => {
                if selection != ControlSelection::Friction {
                    return Err(TfError::UnsupportedControl {
                        control: selection.name(),
                        mode: farm.mode_name(),
                    });
                }
                slots.extend((0..n).map(|entity| ControlSlot { kind: SlotKind::FieldCell, entity }));
            }
        }
        Ok(Self {
            selection,
            continuous: farm.is_continuous(),
            n_entities: n,
            slots,
        })
    }

    /// 槽位数（控制向量长度）
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 是否没有任何槽位
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 全部槽位
    pub fn slots(&self) -> &[ControlSlot] {
        &self.slots
    }

    /// 控制量选择
    pub fn selection(&self) -> ControlSelection {
        self.selection
    }

    /// 构建时的实体数
    pub fn n_entities(&self) -> usize {
        self.n_entities
    }

    /// 设备 `device` 的摩擦槽下标
    pub fn friction_slot(&self, device: usize) -> Option<usize> {
        if self.continuous || !self.selection.controls_friction() || device >= self.n_entities {
            return None;
        }
        Some(device)
    }

    /// 设备 `device` 的 (x, y) 槽下标
    pub fn position_slots(&self, device: usize) -> Option<(usize, usize)> {
        if self.continuous || !self.selection.controls_position() || device >= self.n_entities {
            return None;
        }
        let base = if self.selection.controls_friction() { self.n_entities } else { 0 };
        Some((base + 2 * device, base + 2 * device + 1))
    }

    /// 单元 `cell` 的槽下标
    pub fn cell_slot(&self, cell: usize) -> Option<usize> {
        (self.continuous && cell < self.n_entities).then_some(cell)
    }

    fn check_farm(&self, farm: &FarmModel) -> TfResult<()> {
        let name = if self.continuous { "field cells" } else { "devices" };
        if farm.is_continuous() != self.continuous {
            return Err(TfError::UnsupportedControl {
                control: self.selection.name(),
                mode: farm.mode_name(),
            });
        }
        if farm.n_entities() != self.n_entities {
            return Err(TfError::shape_mismatch(name, self.n_entities, farm.n_entities()));
        }
        Ok(())
    }

    /// 读取农场当前受控属性，按槽位顺序组成控制向量
    pub fn encode(&self, farm: &FarmModel) -> TfResult<Vec<f64>> {
        self.check_farm(farm)?;
        let values = match farm.layout() {
            FarmLayout::Discrete(discrete) => {
                let devices = discrete.devices();
                self.slots
                    .iter()
                    .map(|slot| {
                        let d = &devices[slot.entity];
                        match slot.kind {
                            SlotKind::Friction => d.friction,
                            SlotKind::PositionX => d.position.x,
                            SlotKind::PositionY => d.position.y,
                            SlotKind::FieldCell => 0.0,
                        }
                    })
                    .collect()
            }
            FarmLayout::Continuous(field) => {
                let values = field.values();
                self.slots.iter().map(|slot| values[slot.entity]).collect()
            }
        };
        Ok(values)
    }

    /// 把控制向量按槽位顺序写回农场
    pub fn decode(&self, control: &[f64], farm: &mut FarmModel) -> TfResult<()> {
        if control.len() != self.slots.len() {
            return Err(TfError::shape_mismatch("control", self.slots.len(), control.len()));
        }
        self.check_farm(farm)?;
        match farm.layout_mut() {
            FarmLayout::Discrete(discrete) => {
                let devices = discrete.devices_mut();
                for (slot, &v) in self.slots.iter().zip(control) {
                    let d = &mut devices[slot.entity];
                    match slot.kind {
                        SlotKind::Friction => d.friction = v,
                        SlotKind::PositionX => d.position.x = v,
                        SlotKind::PositionY => d.position.y = v,
                        SlotKind::FieldCell => {}
                    }
                }
            }
            FarmLayout::Continuous(field) => {
                let values = field.values_mut();
                for (slot, &v) in self.slots.iter().zip(control) {
                    values[slot.entity] = v;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, Footprint};
    use crate::field::FieldGrid;
    use crate::shape::TurbineShape;
    use crate::site::Site;
    use glam::DVec2;

    fn site() -> Site {
        Site::rectangle(DVec2::ZERO, DVec2::new(200.0, 100.0)).unwrap()
    }

    fn discrete_farm() -> FarmModel {
        let devices = vec![
            Device::new(0, DVec2::new(30.0, 40.0), 1.5),
            Device::new(1, DVec2::new(90.0, 60.0), 2.5),
            Device::new(2, DVec2::new(150.0, 50.0), 0.1 + 0.2),
        ];
        FarmModel::discrete(site(), devices, Footprint::new(20.0, 20.0), TurbineShape::Bump).unwrap()
    }

    fn continuous_farm() -> FarmModel {
        let s = site();
        let grid = FieldGrid::covering(&s, 4, 2).unwrap();
        FarmModel::continuous(s, grid, 0.01, 0.1).unwrap()
    }

    // ========================================================================
    // 槽位顺序
    // ========================================================================

    #[test]
    fn test_slot_order_friction_then_positions() {
        let farm = discrete_farm();
        let mapping = ControlMapping::build(&farm, ControlSelection::FrictionAndPosition).unwrap();
        assert_eq!(mapping.len(), 9);
        let v = mapping.encode(&farm).unwrap();
        assert_eq!(&v[..3], &[1.5, 2.5, 0.1 + 0.2]);
        assert_eq!(&v[3..], &[30.0, 40.0, 90.0, 60.0, 150.0, 50.0]);
        assert_eq!(mapping.friction_slot(2), Some(2));
        assert_eq!(mapping.position_slots(1), Some((5, 6)));
    }

    #[test]
    fn test_position_only_slots() {
        let farm = discrete_farm();
        let mapping = ControlMapping::build(&farm, ControlSelection::Position).unwrap();
        assert_eq!(mapping.len(), 6);
        assert_eq!(mapping.friction_slot(0), None);
        assert_eq!(mapping.position_slots(0), Some((0, 1)));
        assert!(mapping.slots().iter().all(|s| s.kind != SlotKind::Friction));
    }

    // ========================================================================
    // 往返
    // ========================================================================

    #[test]
    fn test_round_trip_all_discrete_modes() {
        for selection in [
            ControlSelection::Friction,
            ControlSelection::Position,
            ControlSelection::FrictionAndPosition,
        ] {
            let farm = discrete_farm();
            let mapping = ControlMapping::build(&farm, selection).unwrap();
            let v = mapping.encode(&farm).unwrap();

            let mut copy = discrete_farm();
            copy.set_uniform_friction(7.0);
            mapping.decode(&v, &mut copy).unwrap();
            assert_eq!(mapping.encode(&copy).unwrap(), v, "{selection:?}");
        }
    }

    #[test]
    fn test_decode_writes_attributes() {
        let mut farm = discrete_farm();
        let mapping = ControlMapping::build(&farm, ControlSelection::FrictionAndPosition).unwrap();
        let mut v = mapping.encode(&farm).unwrap();
        v[1] = 9.0;
        v[3] = 31.0;
        farm.apply(&v, &mapping).unwrap();
        assert_eq!(farm.devices()[1].friction, 9.0);
        assert_eq!(farm.devices()[0].position.x, 31.0);
    }

    #[test]
    fn test_round_trip_continuous() {
        let farm = continuous_farm();
        let mapping = ControlMapping::build(&farm, ControlSelection::Friction).unwrap();
        assert_eq!(mapping.len(), 8);
        let v: Vec<f64> = (0..8).map(|i| 0.01 * i as f64).collect();
        let mut copy = continuous_farm();
        mapping.decode(&v, &mut copy).unwrap();
        assert_eq!(mapping.encode(&copy).unwrap(), v);
        assert_eq!(mapping.cell_slot(5), Some(5));
    }

    // ========================================================================
    // 形状错误
    // ========================================================================

    #[test]
    fn test_decode_wrong_length() {
        let mut farm = discrete_farm();
        let mapping = ControlMapping::build(&farm, ControlSelection::Friction).unwrap();
        for len in [0, 2, 4] {
            let err = mapping.decode(&vec![1.0; len], &mut farm).unwrap_err();
            assert!(matches!(err, TfError::ShapeMismatch { expected: 3, .. }));
        }
        // 失败时不写回任何值
        assert_eq!(farm.devices()[0].friction, 1.5);
    }

    #[test]
    fn test_encode_wrong_entity_count() {
        let farm = discrete_farm();
        let mapping = ControlMapping::build(&farm, ControlSelection::Friction).unwrap();
        let smaller = FarmModel::discrete(
            site(),
            vec![Device::new(0, DVec2::new(50.0, 50.0), 1.0)],
            Footprint::new(20.0, 20.0),
            TurbineShape::Bump,
        )
        .unwrap();
        let err = mapping.encode(&smaller).unwrap_err();
        assert!(matches!(err, TfError::ShapeMismatch { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn test_continuous_rejects_position_controls() {
        let farm = continuous_farm();
        let err = ControlMapping::build(&farm, ControlSelection::FrictionAndPosition).unwrap_err();
        assert!(matches!(err, TfError::UnsupportedControl { mode: "continuous", .. }));
    }
}
