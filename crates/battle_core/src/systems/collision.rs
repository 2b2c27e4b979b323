use crate::components::{Collision, ComponentKind, EntityId};
use crate::events::CollisionEvent;
use crate::math::{Fixed, Vec2Fixed};
use crate::registry::Registry;
use crate::scheduler::{SimContext, System};

/// Pairwise AABB overlap resolution.
///
/// Overlapping pairs are pushed apart along the axis of least overlap
/// (X on ties). Two dynamic bodies split the push evenly; a dynamic body
/// against a static one takes all of it. Static pairs and excluded group
/// pairs are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollisionSystem;

const REQUIRED: &[ComponentKind] = &[ComponentKind::Position, ComponentKind::Collision];

/// Axis and depth of an overlap between two boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Overlap {
    /// Resolve along X (otherwise Y).
    pub along_x: bool,
    /// Penetration depth on that axis.
    pub depth: Fixed,
}

/// Overlap of two boxes centered at `a` and `b`, if they intersect.
pub(crate) fn overlap(a: Vec2Fixed, box_a: &Collision, b: Vec2Fixed, box_b: &Collision) -> Option<Overlap> {
    let overlap_x = box_a.half_width + box_b.half_width - (a.x - b.x).abs();
    let overlap_y = box_a.half_height + box_b.half_height - (a.y - b.y).abs();
    if overlap_x <= Fixed::ZERO || overlap_y <= Fixed::ZERO {
        return None;
    }
    Some(if overlap_x <= overlap_y {
        Overlap {
            along_x: true,
            depth: overlap_x,
        }
    } else {
        Overlap {
            along_x: false,
            depth: overlap_y,
        }
    })
}

fn body(registry: &Registry, id: EntityId) -> Option<(Vec2Fixed, Collision)> {
    let entity = registry.get(id)?;
    if entity.combat.is_some_and(|combat| !combat.alive) {
        return None;
    }
    Some((entity.position?.value, entity.collision.clone()?))
}

fn push(registry: &mut Registry, id: EntityId, along_x: bool, amount: Fixed) {
    if let Some(position) = registry.get_mut(id).and_then(|e| e.position.as_mut()) {
        if along_x {
            position.value.x += amount;
        } else {
            position.value.y += amount;
        }
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn required_components(&self) -> &'static [ComponentKind] {
        REQUIRED
    }

    fn update(&mut self, _dt: Fixed, registry: &mut Registry, ctx: &mut SimContext) {
        let ids = registry.query(REQUIRED);

        for (index, &a) in ids.iter().enumerate() {
            for &b in &ids[index + 1..] {
                let (Some((pos_a, box_a)), Some((pos_b, box_b))) = (body(registry, a), body(registry, b))
                else {
                    continue;
                };
                if box_a.is_static && box_b.is_static {
                    continue;
                }
                if ctx.config.excludes(&box_a.group, &box_b.group) {
                    continue;
                }
                let Some(hit) = overlap(pos_a, &box_a, pos_b, &box_b) else {
                    continue;
                };

                // `a` is pushed toward negative when it sits at or below `b`.
                let a_first = if hit.along_x {
                    pos_a.x <= pos_b.x
                } else {
                    pos_a.y <= pos_b.y
                };
                let direction = if a_first { -Fixed::ONE } else { Fixed::ONE };

                let (share_a, share_b) = match (box_a.is_static, box_b.is_static) {
                    (false, false) => {
                        let half = hit.depth / Fixed::from_num(2);
                        (half, hit.depth - half)
                    }
                    (false, true) => (hit.depth, Fixed::ZERO),
                    _ => (Fixed::ZERO, hit.depth),
                };

                push(registry, a, hit.along_x, direction * share_a);
                push(registry, b, hit.along_x, -direction * share_b);
                ctx.events.collisions.push(CollisionEvent { a, b });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Position;
    use crate::systems::test_support::context;

    fn spawn(registry: &mut Registry, x: i32, y: i32, collision: Collision) -> EntityId {
        let id = registry.create();
        let entity = registry.get_mut(id).unwrap();
        entity.position = Some(Position::new(Vec2Fixed::from_ints(x, y)));
        entity.collision = Some(collision);
        id
    }

    fn unit(group: &str) -> Collision {
        Collision::dynamic(Fixed::from_num(2), Fixed::from_num(2), group)
    }

    fn position(registry: &Registry, id: EntityId) -> Vec2Fixed {
        registry.get(id).unwrap().position.unwrap().value
    }

    #[test]
    fn test_dynamic_pair_splits_evenly() {
        let mut registry = Registry::new();
        let a = spawn(&mut registry, 0, 0, unit("enemy"));
        let b = spawn(&mut registry, 1, 0, unit("enemy"));
        registry.flush();
        let mut ctx = context();

        CollisionSystem.update(Fixed::ONE, &mut registry, &mut ctx);

        let half = Fixed::ONE / Fixed::from_num(2);
        assert_eq!(position(&registry, a), Vec2Fixed::new(-half, Fixed::ZERO));
        assert_eq!(position(&registry, b), Vec2Fixed::new(Fixed::ONE + half, Fixed::ZERO));
        assert_eq!(ctx.events.collisions, vec![CollisionEvent { a, b }]);
    }

    #[test]
    fn test_static_body_does_not_move() {
        let mut registry = Registry::new();
        let wall = spawn(
            &mut registry,
            0,
            0,
            Collision::fixed(Fixed::from_num(2), Fixed::from_num(2), "wall"),
        );
        let mover = spawn(&mut registry, 0, 1, unit("enemy"));
        registry.flush();

        CollisionSystem.update(Fixed::ONE, &mut registry, &mut context());

        assert_eq!(position(&registry, wall), Vec2Fixed::ZERO);
        assert_eq!(position(&registry, mover), Vec2Fixed::from_ints(0, 2));
    }

    #[test]
    fn test_excluded_groups_pass_through() {
        let mut registry = Registry::new();
        let a = spawn(&mut registry, 0, 0, unit("player"));
        let b = spawn(&mut registry, 0, 0, unit("playerBullet"));
        registry.flush();
        let mut ctx = context();

        CollisionSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert_eq!(position(&registry, a), Vec2Fixed::ZERO);
        assert_eq!(position(&registry, b), Vec2Fixed::ZERO);
        assert!(ctx.events.collisions.is_empty());
    }

    #[test]
    fn test_static_pairs_are_skipped() {
        let mut registry = Registry::new();
        let wall = Collision::fixed(Fixed::from_num(2), Fixed::from_num(2), "wall");
        spawn(&mut registry, 0, 0, wall.clone());
        spawn(&mut registry, 0, 0, wall);
        registry.flush();
        let mut ctx = context();

        CollisionSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert!(ctx.events.collisions.is_empty());
    }

    #[test]
    fn test_equal_overlap_resolves_along_x() {
        let box_ = unit("enemy");
        let hit = overlap(Vec2Fixed::ZERO, &box_, Vec2Fixed::from_ints(1, 1), &box_).unwrap();
        assert!(hit.along_x);
        assert_eq!(hit.depth, Fixed::ONE);
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let box_ = unit("enemy");
        assert!(overlap(Vec2Fixed::ZERO, &box_, Vec2Fixed::from_ints(2, 0), &box_).is_none());
    }
}
