// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type identifier to human-readable name lookup.

use std::collections::HashMap;

/// Resolves a numeric type identifier to its class name.
pub trait TypeNameResolver {
    fn name_for_id(&self, type_id: i32) -> Option<&str>;
}

/// Well-known class identifiers.
const BUILTIN_CLASSES: &[(i32, &str)] = &[
    (1, "GameObject"),
    (2, "Component"),
    (3, "LevelGameManager"),
    (4, "Transform"),
    (5, "TimeManager"),
    (8, "Behaviour"),
    (9, "GameManager"),
    (11, "AudioManager"),
    (18, "EditorExtension"),
    (20, "Camera"),
    (21, "Material"),
    (23, "MeshRenderer"),
    (25, "Renderer"),
    (27, "Texture"),
    (28, "Texture2D"),
    (29, "SceneSettings"),
    (33, "MeshFilter"),
    (43, "Mesh"),
    (48, "Shader"),
    (49, "TextAsset"),
    (54, "Rigidbody"),
    (56, "Collider"),
    (65, "BoxCollider"),
    (74, "AnimationClip"),
    (81, "AudioListener"),
    (82, "AudioSource"),
    (83, "AudioClip"),
    (84, "RenderTexture"),
    (91, "AnimatorController"),
    (95, "Animator"),
    (104, "RenderSettings"),
    (108, "Light"),
    (114, "MonoBehaviour"),
    (115, "MonoScript"),
    (128, "Font"),
    (135, "SphereCollider"),
    (136, "CapsuleCollider"),
    (137, "SkinnedMeshRenderer"),
    (142, "AssetBundle"),
    (150, "PreloadData"),
    (157, "LightmapSettings"),
    (196, "NavMeshSettings"),
    (198, "ParticleSystem"),
    (199, "ParticleSystemRenderer"),
    (212, "SpriteRenderer"),
    (213, "Sprite"),
    (222, "CanvasRenderer"),
    (223, "Canvas"),
    (224, "RectTransform"),
];

/// Table-backed resolver.
#[derive(Debug, Clone, Default)]
pub struct ClassIdTable {
    names: HashMap<i32, String>,
}

impl ClassIdTable {
    /// Empty table: every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-filled with the well-known class identifiers.
    pub fn builtin() -> Self {
        let names = BUILTIN_CLASSES
            .iter()
            .map(|&(id, name)| (id, name.to_string()))
            .collect();
        Self { names }
    }

    pub fn insert(&mut self, type_id: i32, name: impl Into<String>) {
        self.names.insert(type_id, name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TypeNameResolver for ClassIdTable {
    fn name_for_id(&self, type_id: i32) -> Option<&str> {
        self.names.get(&type_id).map(String::as_str)
    }
}

impl TypeNameResolver for HashMap<i32, String> {
    fn name_for_id(&self, type_id: i32) -> Option<&str> {
        self.get(&type_id).map(String::as_str)
    }
}
