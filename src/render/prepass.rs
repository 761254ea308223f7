//! GPU executor for the two-pass frame.

use std::num::NonZeroU64;

use super::pipelines::Pipelines;
use super::plan::{PassPlan, plan_frame, plan_opaque_only};
use super::target::{PrepassTarget, ensure_target};
use super::uniforms::{FrameUniforms, MaterialSet, MaterialUniforms, ModelUniforms};
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::mesh::{InstanceBuffer, Mesh};
use crate::scene::{BlendMaterial, GRASS_MESH, LoadedScene, NodeId, SceneGraph};
use crate::texture::Texture;

/// Dynamic-offset stride for model uniforms; the minimum uniform offset alignment
/// wgpu guarantees.
const MODEL_STRIDE: u64 = 256;

/// What the renderer needs from the frame loop.
pub struct FrameInput<'a> {
    pub graph: &'a SceneGraph,
    pub camera: &'a Camera,
    pub materials: &'a MaterialSet,
    pub clear_color: [f32; 3],
}

struct GpuScene {
    meshes: Vec<Mesh>,
    grass: Option<InstanceBuffer>,
    atlas: Texture,
}

struct MaterialBuffers {
    water: wgpu::Buffer,
    grass: wgpu::Buffer,
}

/// Renders the scene in two submissions: opaque depth and colour into an off-screen
/// target, then the full scene to the surface with the water and grass materials reading
/// that target.
///
/// Until the scene, the target and both blend materials exist, a frame is rendered
/// opaque-only in a single submission.
pub struct DepthPrepassRenderer {
    pipelines: Pipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_slots: u64,
    material_buffers: MaterialBuffers,
    material_groups: Option<[wgpu::BindGroup; 2]>,
    target: Option<PrepassTarget>,
    scene: Option<GpuScene>,
}

impl DepthPrepassRenderer {
    pub fn new(gpu: &GpuContext) -> Self {
        let pipelines = Pipelines::new(gpu);

        let frame_size = std::mem::size_of::<FrameUniforms>() as u64;
        let frame_buffer = uniform_buffer(gpu, "Frame Uniforms", frame_size);
        let frame_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &pipelines.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let model_slots = 8;
        let (model_buffer, model_bind_group) = model_resources(gpu, &pipelines, model_slots);

        let material_size = std::mem::size_of::<MaterialUniforms>() as u64;
        let material_buffers = MaterialBuffers {
            water: uniform_buffer(gpu, "Water Uniforms", material_size),
            grass: uniform_buffer(gpu, "Grass Uniforms", material_size),
        };

        Self {
            pipelines,
            frame_buffer,
            frame_bind_group,
            model_buffer,
            model_bind_group,
            model_slots,
            material_buffers,
            material_groups: None,
            target: PrepassTarget::new(gpu),
            scene: None,
        }
    }

    /// Upload the geometry of a freshly loaded scene.
    pub fn upload_scene(&mut self, gpu: &GpuContext, scene: &LoadedScene) {
        let meshes = scene
            .meshes
            .iter()
            .enumerate()
            .map(|(i, geometry)| Mesh::from_geometry(gpu, geometry, &format!("Scene Mesh {i}")))
            .collect();
        let grass = (!scene.grass_instances.is_empty())
            .then(|| InstanceBuffer::new(gpu, &scene.grass_instances));
        let atlas = Texture::from_image(gpu, &scene.grass_atlas, "Grass Atlas");

        self.ensure_model_slots(gpu, scene.graph.len() as u64);
        self.scene = Some(GpuScene {
            meshes,
            grass,
            atlas,
        });
        self.rebuild_material_groups(gpu);
        tracing::info!(meshes = scene.meshes.len(), "scene uploaded to GPU");
    }

    /// Whether the next frame can run the depth pre-pass.
    pub fn prepass_ready(&self, materials: &MaterialSet) -> bool {
        self.scene.is_some()
            && self.target.is_some()
            && self.material_groups.is_some()
            && materials.is_complete()
    }

    /// Recreate the off-screen target if the surface size changed.
    pub fn resize(&mut self, gpu: &GpuContext) -> bool {
        if !ensure_target(&mut self.target, gpu) {
            return false;
        }
        self.rebuild_material_groups(gpu);
        true
    }

    fn ensure_model_slots(&mut self, gpu: &GpuContext, needed: u64) {
        if needed <= self.model_slots {
            return;
        }
        let slots = needed.next_power_of_two();
        let (buffer, bind_group) = model_resources(gpu, &self.pipelines, slots);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_slots = slots;
    }

    fn rebuild_material_groups(&mut self, gpu: &GpuContext) {
        let (Some(target), Some(scene)) = (&self.target, &self.scene) else {
            self.material_groups = None;
            return;
        };
        let group = |label: &str, buffer: &wgpu::Buffer| {
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.pipelines.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&target.depth_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&target.color_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&scene.atlas.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(&scene.atlas.sampler),
                    },
                ],
            })
        };
        self.material_groups = Some([
            group("Water Material", &self.material_buffers.water),
            group("Grass Material", &self.material_buffers.grass),
        ]);
    }

    /// Render one frame and present it. `ui_fn` draws on top of the finished scene in
    /// the last submission.
    ///
    /// Returns the number of submissions made, which is 0 when the surface was lost
    /// and the frame skipped.
    pub fn render<F>(&mut self, gpu: &GpuContext, frame: &FrameInput, ui_fn: F) -> Result<u32>
    where
        F: FnOnce(&GpuContext, &mut wgpu::RenderPass),
    {
        self.resize(gpu);

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost, reconfiguring");
                gpu.reconfigure();
                return Ok(0);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout, skipping frame");
                return Ok(0);
            }
            Err(err) => return Err(Error::Gpu(err.to_string())),
        };
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_model_slots(gpu, frame.graph.len() as u64);
        self.write_uniforms(gpu, frame);

        let mut submitted = 0;
        let main_plan = if self.prepass_ready(frame.materials) {
            let [prepass, main] = plan_frame(frame.graph);
            self.submit_prepass(gpu, frame, &prepass);
            submitted += 1;
            main
        } else {
            plan_opaque_only(frame.graph)
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Pass Encoder"),
            });
        {
            let [r, g, b] = frame.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: self.target.as_ref().map(|target| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &target.main_depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if self.target.is_some() {
                self.draw_plan(&mut pass, frame.graph, &main_plan);
            }
        }
        {
            let mut ui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            ui_fn(gpu, &mut ui_pass);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        submitted += 1;
        output.present();

        Ok(submitted)
    }

    fn write_uniforms(&self, gpu: &GpuContext, frame: &FrameInput) {
        let uniforms = FrameUniforms::new(frame.camera);
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        for id in frame.graph.depth_first() {
            let Ok(model) = frame.graph.world_matrix(id) else {
                continue;
            };
            gpu.queue.write_buffer(
                &self.model_buffer,
                id.index() as u64 * MODEL_STRIDE,
                bytemuck::cast_slice(&[ModelUniforms::new(model)]),
            );
        }

        for (material, uniforms) in frame.materials.iter() {
            let buffer = match material {
                BlendMaterial::Water => &self.material_buffers.water,
                BlendMaterial::Grass => &self.material_buffers.grass,
            };
            gpu.queue
                .write_buffer(buffer, 0, bytemuck::cast_slice(&[*uniforms]));
        }
    }

    fn submit_prepass(&self, gpu: &GpuContext, frame: &FrameInput, plan: &PassPlan) {
        let Some(target) = &self.target else {
            return;
        };
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Prepass Encoder"),
            });
        {
            let [r, g, b] = frame.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Depth Prepass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.draw_plan(&mut pass, frame.graph, plan);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_plan(&self, pass: &mut wgpu::RenderPass, graph: &SceneGraph, plan: &PassPlan) {
        let Some(scene) = &self.scene else {
            return;
        };
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        pass.set_pipeline(&self.pipelines.opaque);
        for &id in &plan.opaque {
            self.draw_node(pass, graph, scene, id);
        }

        if !plan.bind_prepass {
            return;
        }
        let Some([water_group, grass_group]) = &self.material_groups else {
            return;
        };
        for &(id, material) in &plan.translucent {
            match material {
                BlendMaterial::Water => {
                    pass.set_pipeline(&self.pipelines.water);
                    pass.set_bind_group(2, water_group, &[]);
                }
                BlendMaterial::Grass => {
                    pass.set_pipeline(&self.pipelines.grass);
                    pass.set_bind_group(2, grass_group, &[]);
                }
            }
            self.draw_node(pass, graph, scene, id);
        }
    }

    fn draw_node(
        &self,
        pass: &mut wgpu::RenderPass,
        graph: &SceneGraph,
        scene: &GpuScene,
        id: NodeId,
    ) {
        let Some(mesh_id) = graph.node(id).ok().and_then(|n| n.mesh) else {
            return;
        };
        let Some(mesh) = scene.meshes.get(mesh_id.0) else {
            tracing::warn!(mesh = mesh_id.0, "node references a missing mesh");
            return;
        };
        if id.index() as u64 >= self.model_slots {
            return;
        }

        let offset = (id.index() as u64 * MODEL_STRIDE) as u32;
        pass.set_bind_group(1, &self.model_bind_group, &[offset]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        if mesh_id == GRASS_MESH {
            let Some(instances) = &scene.grass else {
                return;
            };
            pass.set_vertex_buffer(1, instances.buffer.slice(..));
            pass.draw_indexed(0..mesh.index_count, 0, 0..instances.count);
        } else {
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

fn uniform_buffer(gpu: &GpuContext, label: &str, size: u64) -> wgpu::Buffer {
    gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn model_resources(
    gpu: &GpuContext,
    pipelines: &Pipelines,
    slots: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = uniform_buffer(gpu, "Model Uniforms", slots * MODEL_STRIDE);
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Model Bind Group"),
        layout: &pipelines.model_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(std::mem::size_of::<ModelUniforms>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}
