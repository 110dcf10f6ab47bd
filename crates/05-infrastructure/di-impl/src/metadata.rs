//! 基于注册表的元数据提供者

use dashmap::DashMap;
use di_abstractions::{MetadataProvider, TypeDescriptor};
use infrastructure_common::TypeInfo;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

/// 类型描述表
///
/// 以 [`TypeId`] 为键保存 [`TypeDescriptor`]，同一类型重复注册时新描述替换旧描述。
#[derive(Debug, Default)]
pub struct DescriptorTable {
    descriptors: DashMap<TypeId, Arc<TypeDescriptor>>,
}

impl DescriptorTable {
    /// 创建空描述表
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式注册类型描述
    pub fn with(self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// 注册类型描述
    pub fn register(&self, descriptor: TypeDescriptor) {
        debug!("注册类型描述: {}", descriptor.type_info.short_name());
        self.descriptors
            .insert(descriptor.type_info.id, Arc::new(descriptor));
    }

    /// 已注册的类型数量
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl MetadataProvider for DescriptorTable {
    fn descriptor_of(&self, type_info: &TypeInfo) -> Option<Arc<TypeDescriptor>> {
        self.descriptors
            .get(&type_info.id)
            .map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Repository: Send + Sync {}
    struct MemoryRepository;
    impl Repository for MemoryRepository {}

    #[test]
    fn test_assignability_through_descriptor() {
        let table = DescriptorTable::new().with(
            TypeDescriptor::of::<MemoryRepository>()
                .implements(|r: Arc<MemoryRepository>| r as Arc<dyn Repository>),
        );

        let concrete = TypeInfo::of::<MemoryRepository>();
        let contract = TypeInfo::of::<dyn Repository>();
        assert!(table.is_assignable_to(&concrete, &contract));
        assert!(table.is_assignable_to(&concrete, &concrete));
        assert!(!table.is_assignable_to(&contract, &concrete));
        assert!(table.is_primitive_like(&TypeInfo::of::<String>()));
        assert!(!table.is_primitive_like(&concrete));
        assert_eq!(table.len(), 1);
    }
}
